//! Disk Scheduler - asynchronous page I/O on a background worker.
//!
//! Requests are queued on a channel and executed in order by a single worker
//! thread that owns the [`DiskIo`] backend. Each request carries a one-shot
//! completion channel; callers block on [`DiskCompletion::wait`] when they
//! need the result.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, error, trace};

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskIo;

/// A queued disk operation.
enum DiskRequest {
    Read {
        page_id: PageId,
        buf: Box<Page>,
        done: Sender<Result<Box<Page>>>,
    },
    Write {
        page_id: PageId,
        buf: Box<Page>,
        done: Sender<Result<()>>,
    },
}

/// Pending result of a scheduled request.
///
/// Dropping a completion without waiting is allowed; the request still runs.
#[must_use = "a scheduled request's result is only observed through wait()"]
pub struct DiskCompletion<T> {
    rx: Receiver<Result<T>>,
}

impl<T> DiskCompletion<T> {
    /// Block until the worker has executed the request.
    ///
    /// # Errors
    /// The backend's error, or `Error::SchedulerClosed` if the worker died
    /// before answering.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::SchedulerClosed)?
    }
}

/// Owns the disk backend and the worker thread that drives it.
///
/// ```text
///  caller ──schedule_*──▶ [ request channel ] ──▶ worker ──▶ DiskIo
///     ▲                                             │
///     └────────────── DiskCompletion ◀──────────────┘
/// ```
pub struct DiskScheduler {
    /// `None` once shutdown has begun.
    tx: Option<Sender<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
    /// Page count of the backend when the scheduler was created.
    initial_page_count: u32,
}

impl DiskScheduler {
    /// Move `disk` onto a new worker thread.
    ///
    /// # Errors
    /// Fails only if the OS refuses to spawn the thread.
    pub fn new<D: DiskIo + 'static>(disk: D) -> Result<Self> {
        let initial_page_count = disk.page_count();
        let (tx, rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("disk-scheduler".into())
            .spawn(move || Self::run_worker(disk, rx))?;

        debug!(
            "disk scheduler started, backend holds {} pages",
            initial_page_count
        );

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            initial_page_count,
        })
    }

    /// Page count reported by the backend at startup.
    pub fn initial_page_count(&self) -> u32 {
        self.initial_page_count
    }

    /// Queue a read of `page_id` into `buf`. The filled buffer comes back
    /// through the completion.
    pub fn schedule_read(&self, page_id: PageId, buf: Box<Page>) -> DiskCompletion<Box<Page>> {
        let (done, rx) = mpsc::channel();
        self.submit(DiskRequest::Read { page_id, buf, done });
        DiskCompletion { rx }
    }

    /// Queue a write of `buf` as the content of `page_id`.
    pub fn schedule_write(&self, page_id: PageId, buf: Box<Page>) -> DiskCompletion<()> {
        let (done, rx) = mpsc::channel();
        self.submit(DiskRequest::Write { page_id, buf, done });
        DiskCompletion { rx }
    }

    fn submit(&self, request: DiskRequest) {
        // If the worker is gone the request is dropped together with its
        // completion sender, and wait() reports SchedulerClosed.
        if let Some(tx) = &self.tx {
            let _ = tx.send(request);
        }
    }

    fn run_worker<D: DiskIo>(mut disk: D, rx: Receiver<DiskRequest>) {
        // Ends when every sender is dropped and the queue is drained.
        for request in rx {
            match request {
                DiskRequest::Read {
                    page_id,
                    mut buf,
                    done,
                } => {
                    trace!("disk read {}", page_id);
                    let result = disk.read_page(page_id, &mut buf).map(|()| buf);
                    if let Err(e) = &result {
                        error!("disk read of {} failed: {}", page_id, e);
                    }
                    let _ = done.send(result);
                }
                DiskRequest::Write { page_id, buf, done } => {
                    trace!("disk write {}", page_id);
                    let result = disk.write_page(page_id, &buf);
                    if let Err(e) = &result {
                        error!("disk write of {} failed: {}", page_id, e);
                    }
                    let _ = done.send(result);
                }
            }
        }
        debug!("disk scheduler worker exiting");
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("disk scheduler worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDisk;

    #[test]
    fn test_write_then_read() {
        let scheduler = DiskScheduler::new(MemoryDisk::new()).unwrap();

        let mut buf = Page::boxed();
        buf.as_mut_slice()[..5].copy_from_slice(b"hello");
        scheduler
            .schedule_write(PageId::new(0), buf)
            .wait()
            .unwrap();

        let read = scheduler
            .schedule_read(PageId::new(0), Page::boxed())
            .wait()
            .unwrap();
        assert_eq!(&read.as_slice()[..5], b"hello");
    }

    #[test]
    fn test_requests_run_in_order() {
        let scheduler = DiskScheduler::new(MemoryDisk::new()).unwrap();

        // Queue several writes without waiting; the read must see the last.
        let mut pending = Vec::new();
        for i in 0..10u8 {
            let mut buf = Page::boxed();
            buf.as_mut_slice()[0] = i;
            pending.push(scheduler.schedule_write(PageId::new(1), buf));
        }
        let read = scheduler.schedule_read(PageId::new(1), Page::boxed());

        for completion in pending {
            completion.wait().unwrap();
        }
        assert_eq!(read.wait().unwrap().as_slice()[0], 9);
    }

    #[test]
    fn test_initial_page_count() {
        let mut disk = MemoryDisk::new();
        disk.write_page(PageId::new(6), &Page::new()).unwrap();

        let scheduler = DiskScheduler::new(disk).unwrap();
        assert_eq!(scheduler.initial_page_count(), 7);
    }

    #[test]
    fn test_backend_error_propagates() {
        struct BrokenDisk;

        impl DiskIo for BrokenDisk {
            fn read_page(&mut self, _: PageId, _: &mut Page) -> Result<()> {
                Err(std::io::Error::other("bad sector").into())
            }
            fn write_page(&mut self, _: PageId, _: &Page) -> Result<()> {
                Err(std::io::Error::other("read-only").into())
            }
            fn page_count(&self) -> u32 {
                0
            }
        }

        let scheduler = DiskScheduler::new(BrokenDisk).unwrap();
        let read = scheduler.schedule_read(PageId::new(0), Page::boxed()).wait();
        assert!(matches!(read, Err(Error::Io(_))));

        let write = scheduler.schedule_write(PageId::new(0), Page::boxed()).wait();
        assert!(matches!(write, Err(Error::Io(_))));
    }
}
