use std::fmt;
use thiserror::Error;

/// Identifies the workload a debug session attaches to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetIdentity {
    pub component: String,
    pub application: String,
    pub namespace: String,
}

impl TargetIdentity {
    /// Key under which the session record for this target is filed.
    pub fn record_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.namespace, self.application, self.component
        )
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace, self.application, self.component
        )
    }
}

/// The local/remote port mapping addressing one session. The canonical
/// `"local:remote"` text is always derived from the numeric fields via
/// `Display`; it is never parsed back or constructed from free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortPair {
    pub local: u16,
    pub remote: u16,
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.local, self.remote)
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ports cannot be empty")]
    EmptyPair,
    #[error("invalid port pair {pair}: both ports must be positive")]
    InvalidPort { pair: String },
}

/// Immutable description of one forwarding session, assembled once the local
/// port has been negotiated and the target resolved.
#[derive(Clone, Debug)]
pub struct SessionDescriptor {
    pair: PortPair,
    target: TargetIdentity,
}

impl SessionDescriptor {
    pub fn new(pair: PortPair, target: TargetIdentity) -> Self {
        Self { pair, target }
    }

    pub fn pair(&self) -> PortPair {
        self.pair
    }

    pub fn pair_text(&self) -> String {
        self.pair.to_string()
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    /// Defensive check run before the session controller is reached.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pair.local == 0 && self.pair.remote == 0 {
            return Err(ValidationError::EmptyPair);
        }
        if self.pair.local == 0 || self.pair.remote == 0 {
            return Err(ValidationError::InvalidPort {
                pair: self.pair_text(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetIdentity {
        TargetIdentity {
            component: "backend".into(),
            application: "shop".into(),
            namespace: "dev".into(),
        }
    }

    #[test]
    fn pair_renders_local_colon_remote() {
        let same = PortPair {
            local: 5858,
            remote: 5858,
        };
        assert_eq!(same.to_string(), "5858:5858");

        let mixed = PortPair {
            local: 9000,
            remote: 5858,
        };
        assert_eq!(mixed.to_string(), "9000:5858");
    }

    #[test]
    fn descriptor_derives_pair_text() {
        let descriptor = SessionDescriptor::new(
            PortPair {
                local: 52341,
                remote: 5858,
            },
            target(),
        );
        assert_eq!(descriptor.pair_text(), "52341:5858");
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_pair() {
        let descriptor = SessionDescriptor::new(
            PortPair {
                local: 0,
                remote: 0,
            },
            target(),
        );
        let err = descriptor.validate().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyPair));
        assert_eq!(err.to_string(), "ports cannot be empty");
    }

    #[test]
    fn validate_rejects_zero_port() {
        let descriptor = SessionDescriptor::new(
            PortPair {
                local: 0,
                remote: 5858,
            },
            target(),
        );
        assert!(matches!(
            descriptor.validate(),
            Err(ValidationError::InvalidPort { .. })
        ));
    }

    #[test]
    fn record_key_orders_namespace_application_component() {
        assert_eq!(target().record_key(), "dev-shop-backend");
    }
}
