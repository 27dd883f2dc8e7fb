use std::sync::{Arc, OnceLock};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IoOpType {
    Read,
    Write,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockIo {
    pub op: IoOpType,
    pub block: u32,
    pub bytes: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocTarget {
    Block,
    Inode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocOp {
    Allocate,
    Release,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocEvent {
    pub target: AllocTarget,
    pub op: AllocOp,
    /// Block number or inode index involved.
    pub id: u32,
}

pub trait MetricsSink: Send + Sync + 'static {
    fn record_block_io(&self, io: BlockIo);
    fn record_alloc(&self, event: AllocEvent);
}

static METRICS_SINK: OnceLock<Arc<dyn MetricsSink>> = OnceLock::new();

pub fn install_metrics_sink(sink: Arc<dyn MetricsSink>) -> bool {
    METRICS_SINK.set(sink).is_ok()
}

pub fn is_enabled() -> bool {
    METRICS_SINK.get().is_some()
}

pub fn record_block_io(io: BlockIo) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_block_io(io);
    }
}

pub fn record_alloc(event: AllocEvent) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_alloc(event);
    }
}
