mod analyzer;
mod source_pipe;

pub use analyzer::{SpectrumAnalyzer, SpectrumFrame};
pub use source_pipe::SourcePipe;
