pub mod benchmarks;
pub mod segments;

pub use benchmarks::{Benchmark, BenchmarkPriceTable};
pub use segments::{Segment, SegmentConfig, SegmentTable};
