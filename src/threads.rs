//! The CPU strategy.  The rows of a grid are cut into contiguous bands,
//! one per worker, and each worker fills its own disjoint slice of the
//! output buffer.  No pixel reads another pixel's result, so the number
//! of workers never changes the numbers that come out.

use itertools::iproduct;
use num::Complex;
use std::mem;
use std::ops::Range;
use std::time::Instant;

use grid::SampleGrid;

/// Everything a strategy needs to know about a per-pixel computation:
/// given the point a pixel samples, produce that pixel's result.
pub trait PixelKernel: Sync {
    /// The per-pixel result.
    type Output: Copy + Send + Default;

    /// Computes one pixel to completion.
    fn sample(&self, point: Complex<f64>) -> Self::Output;
}

/// Zero asks for one worker per logical CPU.
pub fn worker_count(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

/// Splits `rows` rows into at most `workers` contiguous, left-closed,
/// right-open bands that cover every row.  Rows that don't divide
/// evenly go one apiece to the first bands.
pub fn bands(rows: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1).min(rows.max(1));
    let span = rows / workers;
    let extra = rows % workers;

    let mut start = 0;
    (0..workers)
        .map(|band| {
            let end = start + span + if band < extra { 1 } else { 0 };
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

/// Hands each band of rows in `cells` to `job` on its own scoped
/// thread and waits for all of them.  `job` receives the band's row
/// range and the cells of exactly those rows.  A panic in any worker
/// is re-raised here.
pub fn for_each_band<T, F>(cells: &mut [T], width: usize, workers: usize, job: F)
where
    T: Send,
    F: Fn(Range<usize>, &mut [T]) + Sync,
{
    if width == 0 || cells.is_empty() {
        return;
    }

    let rows = cells.len() / width;
    let mut jobs = Vec::new();
    let mut rest = cells;
    for band in bands(rows, worker_count(workers)) {
        let (chunk, tail) = mem::replace(&mut rest, &mut []).split_at_mut(band.len() * width);
        rest = tail;
        jobs.push((band, chunk));
    }

    if jobs.len() == 1 {
        if let Some((band, chunk)) = jobs.pop() {
            job(band, chunk);
        }
        return;
    }

    let job = &job;
    let joined = crossbeam::scope(|spawner| {
        for (band, chunk) in jobs {
            spawner.spawn(move |_| job(band, chunk));
        }
    });

    if let Err(panic) = joined {
        ::std::panic::resume_unwind(panic);
    }
}

/// Samples every pixel of a grid with `workers` threads and returns the
/// results in computation order (row 0 on `start.im`).
pub fn render<K: PixelKernel>(grid: &SampleGrid, kernel: &K, workers: usize) -> Vec<K::Output> {
    let width = grid.x_resolution;
    let mut cells = vec![K::Output::default(); grid.len()];

    for_each_band(&mut cells, width, workers, |rows, chunk| {
        let began = Instant::now();
        for (cell, (row, col)) in chunk.iter_mut().zip(iproduct!(rows.clone(), 0..width)) {
            *cell = kernel.sample(grid.point(row, col));
        }
        debug!(
            "rows {}..{}: {} points in {:?}",
            rows.start,
            rows.end,
            chunk.len(),
            began.elapsed()
        );
    });

    cells
}
