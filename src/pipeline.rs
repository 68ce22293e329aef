//! Concurrent trimming pipeline.
//!
//! ```text
//! source + batcher ──work──> N trim workers ──results──> result sink
//!     (1 thread)   bounded     (N threads)    bounded     (1 thread)
//! ```
//!
//! Both queues are bounded, so a slow sink stalls the workers and then the source.
//! The source closes the work queue when it runs out of records; the result queue
//! closes once every worker has drained the work queue and exited.
//!
//! Without [`Settings::ordered`], records reach the sink in whatever order the workers
//! finish them. With it, every outcome (including dropped records) carries its input
//! serial and the sink restores input order before writing.
//!
//! A fatal error in the source or the sink raises a shared abort flag. From then on
//! the sink writes nothing more and the other stages wind down; the error is returned
//! to the caller.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info};

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};

use crate::config::*;
use crate::errors::*;
use crate::fastq::*;
use crate::read::*;
use crate::reorder_buffer::ReorderBuffer;
use crate::trim::*;

/// Trim result for the record with the given input serial; `None` if it was dropped.
type Outcome<T> = (u64, Option<T>);

/// Trim single-end records from `source` and write the kept ones to `writer`.
///
/// Records are handed to the workers one at a time. Returns the number of records
/// written.
pub fn run_single<I, W>(
    source: I,
    writer: &mut W,
    adapter: &Adapter,
    settings: &Settings,
) -> Result<u64>
where
    I: Iterator<Item = Result<Record>> + Send,
    W: Write + Send,
{
    info!(
        "Trimming single-end reads with {} worker threads",
        settings.threads
    );

    let written = run_stages(
        settings,
        |work: &Sender<(u64, Record)>, abort: &AtomicBool| dispatch_records(source, work, abort),
        |(serial, record): (u64, Record), outcomes: &mut Vec<Outcome<Record>>| {
            outcomes.push((serial, trim_single(record, adapter)));
        },
        |record: Record| write_fastq_record(&mut *writer, &record),
    )?;
    writer.flush().map_err(Error::WriteIo)?;

    info!("Wrote {} trimmed reads", written);
    Ok(written)
}

/// Trim paired records from `source`, writing the first reads of kept pairs to
/// `writer1` and the second reads to `writer2`.
///
/// Pairs are handed to the workers in batches of [`Settings::batch_size`]. Returns the
/// number of pairs written.
pub fn run_paired<I, W1, W2>(
    source: I,
    writer1: &mut W1,
    writer2: &mut W2,
    adapter: &Adapter,
    settings: &Settings,
) -> Result<u64>
where
    I: Iterator<Item = Result<RecordPair>> + Send,
    W1: Write + Send,
    W2: Write + Send,
{
    info!(
        "Trimming paired reads with {} worker threads and batches of {}",
        settings.threads, settings.batch_size
    );

    let written = run_stages(
        settings,
        |work: &Sender<(u64, Vec<RecordPair>)>, abort: &AtomicBool| {
            dispatch_batches(source, settings.batch_size, work, abort)
        },
        |(first, batch): (u64, Vec<RecordPair>), outcomes: &mut Vec<Outcome<RecordPair>>| {
            outcomes.extend(
                (first..)
                    .zip(batch)
                    .map(|(serial, pair)| (serial, trim_paired(pair, adapter))),
            );
        },
        |pair: RecordPair| {
            write_fastq_record(&mut *writer1, &pair.r1)?;
            write_fastq_record(&mut *writer2, &pair.r2)
        },
    )?;
    writer1.flush().map_err(Error::WriteIo)?;
    writer2.flush().map_err(Error::WriteIo)?;

    info!("Wrote {} trimmed read pairs", written);
    Ok(written)
}

/// Send every record on its own, tagged with its serial.
fn dispatch_records<I>(source: I, work: &Sender<(u64, Record)>, abort: &AtomicBool) -> Result<()>
where
    I: Iterator<Item = Result<Record>>,
{
    let mut sent = 0u64;

    for record in source {
        let record = record?;
        if abort.load(Ordering::Relaxed) || work.send((sent, record)).is_err() {
            return Ok(());
        }
        sent += 1;
    }

    debug!("Input exhausted after {} reads", sent);
    Ok(())
}

/// Send pairs in batches of `batch_size`, each tagged with the serial of its first pair.
/// A final partial batch is sent when the source runs out.
fn dispatch_batches<I>(
    source: I,
    batch_size: usize,
    work: &Sender<(u64, Vec<RecordPair>)>,
    abort: &AtomicBool,
) -> Result<()>
where
    I: Iterator<Item = Result<RecordPair>>,
{
    let mut batch = Vec::with_capacity(batch_size);
    let mut sent = 0u64;

    for pair in source {
        batch.push(pair?);

        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            let len = full.len() as u64;
            if abort.load(Ordering::Relaxed) || work.send((sent, full)).is_err() {
                return Ok(());
            }
            sent += len;
        }
    }

    if !batch.is_empty() {
        let len = batch.len() as u64;
        if abort.load(Ordering::Relaxed) || work.send((sent, batch)).is_err() {
            return Ok(());
        }
        sent += len;
    }

    debug!("Input exhausted after {} read pairs", sent);
    Ok(())
}

/// Run the source, the workers, and the sink on their own threads until the sink has
/// written the last result.
fn run_stages<U, T, P, F, S>(settings: &Settings, produce: P, process: F, mut write: S) -> Result<u64>
where
    U: Send,
    T: Send,
    P: FnOnce(&Sender<U>, &AtomicBool) -> Result<()> + Send,
    F: Fn(U, &mut Vec<Outcome<T>>) + Sync,
    S: FnMut(T) -> io::Result<()> + Send,
{
    let (work_tx, work_rx) = bounded::<U>(settings.queue_capacity);
    let (result_tx, result_rx) = bounded::<Outcome<T>>(settings.queue_capacity);
    let abort = AtomicBool::new(false);
    let abort = &abort;
    let process = &process;
    let ordered = settings.ordered;

    thread::scope(|s| {
        let producer = s.spawn(move || {
            let res = produce(&work_tx, abort);
            if res.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            // dropping the sender closes the work queue
            res
        });

        let workers = (0..settings.threads)
            .map(|id| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move || trim_worker(id, work_rx, result_tx, process, ordered, abort))
            })
            .collect::<Vec<_>>();
        // the result queue closes when the last worker drops its sender
        drop(work_rx);
        drop(result_tx);

        let sink = s.spawn(move || {
            let res = drain_results(result_rx, ordered, abort, &mut write);
            if res.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            res
        });

        for worker in workers {
            join(worker);
        }
        debug!("All {} workers finished", settings.threads);

        let produced = join(producer);
        let written = join(sink);
        produced.and(written)
    })
}

fn trim_worker<U, T, F>(
    id: usize,
    work: Receiver<U>,
    results: Sender<Outcome<T>>,
    process: &F,
    ordered: bool,
    abort: &AtomicBool,
) where
    F: Fn(U, &mut Vec<Outcome<T>>),
{
    debug!("Worker {} started", id);
    let mut outcomes = Vec::new();

    'units: for unit in work.iter() {
        if abort.load(Ordering::Relaxed) {
            break;
        }

        process(unit, &mut outcomes);

        for outcome in outcomes.drain(..) {
            // dropped records are only needed to close gaps when restoring order
            if outcome.1.is_none() && !ordered {
                continue;
            }
            if results.send(outcome).is_err() {
                break 'units;
            }
        }
    }

    debug!("Worker {} finished", id);
}

fn drain_results<T>(
    results: Receiver<Outcome<T>>,
    ordered: bool,
    abort: &AtomicBool,
    write: &mut impl FnMut(T) -> io::Result<()>,
) -> Result<u64> {
    let mut written = 0u64;
    let mut pending = ReorderBuffer::new();

    for (serial, outcome) in results.iter() {
        if !ordered {
            if let Some(item) = outcome {
                if abort.load(Ordering::Relaxed) {
                    return Ok(written);
                }
                write(item).map_err(Error::WriteIo)?;
                written += 1;
            }
            continue;
        }

        pending.insert(serial, outcome);
        while let Some(outcome) = pending.try_pop_next() {
            if let Some(item) = outcome {
                if abort.load(Ordering::Relaxed) {
                    return Ok(written);
                }
                write(item).map_err(Error::WriteIo)?;
                written += 1;
            }
        }
    }

    debug_assert!(abort.load(Ordering::Relaxed) || pending.is_empty());
    Ok(written)
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|e| std::panic::resume_unwind(e))
}
