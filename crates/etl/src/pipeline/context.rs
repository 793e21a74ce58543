use std::sync::Arc;

use crate::filter::Classifier;
use crate::parser::Extractor;
use crate::writer::PartitionedWriter;

/// Everything the workers share. Built once at boot; only the writer's
/// handle registry mutates afterwards.
pub struct EtlContext {
    pub extractor: Extractor,
    pub classifier: Classifier,
    pub writer: Arc<PartitionedWriter>,
}

impl EtlContext {
    pub fn new(extractor: Extractor, classifier: Classifier, writer: PartitionedWriter) -> Self {
        Self { extractor, classifier, writer: Arc::new(writer) }
    }
}
