pub mod finding;
pub mod resource;
pub mod scan;
pub mod telemetry;

pub use finding::{Confidence, CostKind, DetectionRecord, Finding, FindingMetadata};
pub use resource::{
    Attachment, AttachmentKind, GLOBAL_REGION, Resource, ResourceState, ResourceType,
};
pub use scan::{AccountIdentity, RegionError, ScanReport, SkippedScenario};
pub use telemetry::{MetricQuery, MetricStat, TelemetrySample};
