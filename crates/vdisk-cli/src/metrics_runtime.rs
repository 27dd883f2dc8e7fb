use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use vdisk_rs::metrics::{AllocEvent, AllocOp, AllocTarget, BlockIo, IoOpType, MetricsSink};

/// Process-wide block I/O and allocator totals.
#[derive(Default)]
pub struct CountingSink {
    reads: AtomicU64,
    writes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    blocks_allocated: AtomicU64,
    blocks_released: AtomicU64,
    inodes_allocated: AtomicU64,
    inodes_released: AtomicU64,
}

impl MetricsSink for CountingSink {
    fn record_block_io(&self, io: BlockIo) {
        let (count, bytes) = match io.op {
            IoOpType::Read => (&self.reads, &self.bytes_read),
            IoOpType::Write => (&self.writes, &self.bytes_written),
        };
        count.fetch_add(1, Ordering::Relaxed);
        bytes.fetch_add(io.bytes, Ordering::Relaxed);
    }

    fn record_alloc(&self, event: AllocEvent) {
        let counter = match (event.target, event.op) {
            (AllocTarget::Block, AllocOp::Allocate) => &self.blocks_allocated,
            (AllocTarget::Block, AllocOp::Release) => &self.blocks_released,
            (AllocTarget::Inode, AllocOp::Allocate) => &self.inodes_allocated,
            (AllocTarget::Inode, AllocOp::Release) => &self.inodes_released,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl CountingSink {
    /// Installs a fresh sink as the global one. Returns `None` if another sink
    /// was installed first.
    pub fn install() -> Option<Arc<Self>> {
        let sink = Arc::new(Self::default());
        vdisk_rs::metrics::install_metrics_sink(sink.clone()).then_some(sink)
    }

    pub fn log_totals(&self) {
        debug!(
            "exit: reads={}, writes={}, bytes_read={}, bytes_written={}, blocks +{}/-{}, inodes +{}/-{}",
            self.reads.load(Ordering::Relaxed),
            self.writes.load(Ordering::Relaxed),
            self.bytes_read.load(Ordering::Relaxed),
            self.bytes_written.load(Ordering::Relaxed),
            self.blocks_allocated.load(Ordering::Relaxed),
            self.blocks_released.load(Ordering::Relaxed),
            self.inodes_allocated.load(Ordering::Relaxed),
            self.inodes_released.load(Ordering::Relaxed),
        );
    }
}
