pub mod analysis;
pub mod cache;
pub mod config;
pub mod detector;
pub mod external;
pub mod extractor;
pub mod remote;
pub mod scanner;
pub mod uas;

pub use analysis::{ExtractionSummary, RepositoryAnalysis};
pub use cache::ExtractionCache;
pub use config::Config;
pub use detector::{ArchitectureType, DetectionResult, Framework, Language, LanguageDetector};
pub use external::{
    ExternalExtractor, ExternalParser, ExternalParserError, ParserSearch, ProcessLimiter,
};
pub use extractor::Extractor;
pub use remote::RemoteTarget;
pub use scanner::{scan_repository, FileCategory, FileInfo, IgnoreRules, RepositoryScanner, ScanStatistics};
pub use uas::*;
