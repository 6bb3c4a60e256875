// Sat Oct 17 2026 - Alex

use crate::config::Config;
use crate::introspect::{IntrospectError, ObjectVerdict, Rejection};
use crate::memory::{Address, FaultKind, MemoryProbe, ProbeOutcome};
use crate::runtime::{AllocationSizer, ClassRef, TypeMetadata};
use std::sync::Arc;

pub(crate) enum HeaderRead {
    Class(ClassRef),
    Unreadable(FaultKind),
    Unknown(Address),
}

/// Decides whether an arbitrary address plausibly holds an object header. Each call does one
/// probe, one class lookup and at most one allocation size query.
pub struct PointerClassifier {
    prober: Arc<dyn MemoryProbe>,
    metadata: Arc<dyn TypeMetadata>,
    sizer: Option<Arc<dyn AllocationSizer>>,
    config: Config,
}

impl PointerClassifier {
    pub fn new(prober: Arc<dyn MemoryProbe>, metadata: Arc<dyn TypeMetadata>, config: Config) -> Self {
        Self {
            prober,
            metadata,
            sizer: None,
            config,
        }
    }

    pub fn with_sizer(mut self, sizer: Arc<dyn AllocationSizer>) -> Self {
        self.sizer = Some(sizer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classify(&self, address: Address) -> Result<ObjectVerdict, IntrospectError> {
        if let Some(rejection) = self.screen(address) {
            log::debug!("{} rejected before probing: {}", address, rejection);
            return Ok(ObjectVerdict::rejected(address, rejection));
        }

        let class = match self.read_header(address)? {
            HeaderRead::Class(class) => class,
            HeaderRead::Unreadable(kind) => {
                log::debug!("{} header unreadable: {}", address, kind);
                return Ok(ObjectVerdict::rejected(address, Rejection::HeaderUnreadable(kind)));
            }
            HeaderRead::Unknown(isa) => {
                log::debug!("{} header {} does not resolve to a class", address, isa);
                return Ok(ObjectVerdict::rejected(address, Rejection::UnknownClass(isa)));
            }
        };

        let large_enough = self.allocation_large_enough(address, class);
        Ok(ObjectVerdict::object(address, class, large_enough))
    }

    fn screen(&self, address: Address) -> Option<Rejection> {
        if address.is_null() {
            Some(Rejection::Null)
        } else if address.as_usize() < self.config.min_object_address {
            Some(Rejection::BelowMinimumAddress)
        } else if !address.is_aligned(self.config.pointer_alignment) {
            Some(Rejection::Misaligned)
        } else {
            None
        }
    }

    pub(crate) fn read_header(&self, address: Address) -> Result<HeaderRead, IntrospectError> {
        let word = match self.prober.probe_word(address)? {
            ProbeOutcome::Unreadable(kind) => return Ok(HeaderRead::Unreadable(kind)),
            readable => readable.as_word(),
        };
        let Some(word) = word else {
            return Ok(HeaderRead::Unreadable(FaultKind::Unmapped));
        };

        let isa = Address::new(word & self.config.isa_mask);
        Ok(match self.metadata.resolve_class(isa) {
            Some(class) => HeaderRead::Class(class),
            None => HeaderRead::Unknown(isa),
        })
    }

    fn allocation_large_enough(&self, address: Address, class: ClassRef) -> Option<bool> {
        if !self.config.check_allocation_size {
            return None;
        }
        let allocated = self.sizer.as_ref()?.allocation_size(address)?;
        let needed = self.metadata.instance_size(class).ok()?;
        Some(allocated >= needed)
    }
}
