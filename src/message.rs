//! ISO 15118-20 CommonMessages message types.
//!
//! The integer values are fixed and shared with non-Rust callers. Each type
//! names one global element of the CommonMessages namespace.

use std::fmt;
use std::str::FromStr;

use crate::grammar::GrammarSet;
use crate::{Error, Result};

/// Namespace of the ISO 15118-20 CommonMessages schema.
pub const COMMON_MESSAGES_NS: &str = "urn:iso:std:iso:15118:-20:CommonMessages";

macro_rules! message_types {
    ($($name:ident = $id:literal,)*) => {
        /// A CommonMessages message, identified by its element name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum MessageType {
            $($name = $id,)*
        }

        impl MessageType {
            /// All message types in id order.
            pub const ALL: &'static [MessageType] = &[$(MessageType::$name,)*];

            /// Local name of the message element.
            pub fn name(self) -> &'static str {
                match self {
                    $(MessageType::$name => stringify!($name),)*
                }
            }
        }

        impl TryFrom<i32> for MessageType {
            type Error = Error;

            fn try_from(id: i32) -> Result<Self> {
                match id {
                    $($id => Ok(MessageType::$name),)*
                    _ => Err(Error::UnknownMessageType(id)),
                }
            }
        }
    };
}

message_types! {
    AuthorizationReq = 0,
    AuthorizationRes = 1,
    AuthorizationSetupReq = 2,
    AuthorizationSetupRes = 3,
    CLReqControlMode = 4,
    CLResControlMode = 5,
    CertificateInstallationReq = 7,
    CertificateInstallationRes = 8,
    MeteringConfirmationReq = 16,
    MeteringConfirmationRes = 17,
    PowerDeliveryReq = 21,
    PowerDeliveryRes = 22,
    ScheduleExchangeReq = 27,
    ScheduleExchangeRes = 28,
    ServiceDetailReq = 29,
    ServiceDetailRes = 30,
    ServiceDiscoveryReq = 31,
    ServiceDiscoveryRes = 32,
    ServiceSelectionReq = 33,
    ServiceSelectionRes = 34,
    SessionSetupReq = 35,
    SessionSetupRes = 36,
    SessionStopReq = 37,
    SessionStopRes = 38,
    VehicleCheckInReq = 49,
    VehicleCheckInRes = 50,
    VehicleCheckOutReq = 51,
    VehicleCheckOutRes = 52,
}

impl MessageType {
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Index of this message's root element in `grammars`.
    ///
    /// The element is looked up in the CommonMessages namespace first. A
    /// schema with another target namespace still resolves if exactly one
    /// global element carries the local name.
    pub fn resolve(self, grammars: &GrammarSet) -> Result<usize> {
        let local = self.name();
        let qualified = crate::QName::new(COMMON_MESSAGES_NS, local);
        if let Some(index) = grammars.root_index(&qualified) {
            return Ok(index);
        }
        let mut matches = grammars
            .roots()
            .iter()
            .enumerate()
            .filter(|(_, root)| &*root.name.local_name == local);
        match (matches.next(), matches.next()) {
            (Some((index, _)), None) => Ok(index),
            _ => Err(Error::MessageTypeNotRegistered(local)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    /// Accepts the element name or the numeric id.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(id) = s.parse::<i32>() {
            return Self::try_from(id);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown message type '{s}'")))
    }
}

/// Element name for a raw message type id, `Unknown(n)` for unknown ids.
pub fn message_type_name(id: i32) -> String {
    match MessageType::try_from(id) {
        Ok(m) => m.name().to_string(),
        Err(_) => format!("Unknown({id})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn ids_and_names() {
        assert_eq!(MessageType::ALL.len(), 28);
        assert_eq!(MessageType::SessionSetupReq.id(), 35);
        assert_eq!(MessageType::try_from(52).unwrap(), MessageType::VehicleCheckOutRes);
        assert_eq!(MessageType::CLReqControlMode.to_string(), "CLReqControlMode");
        for m in MessageType::ALL {
            assert_eq!(MessageType::try_from(m.id()).unwrap(), *m);
            assert_eq!(m.name().parse::<MessageType>().unwrap(), *m);
        }
    }

    #[test]
    fn unknown_ids() {
        for id in [-1, 6, 9, 53, i32::MAX] {
            let err = MessageType::try_from(id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(message_type_name(6), "Unknown(6)");
        assert_eq!(message_type_name(0), "AuthorizationReq");
        assert!("NoSuchReq".parse::<MessageType>().is_err());
        assert_eq!("36".parse::<MessageType>().unwrap(), MessageType::SessionSetupRes);
    }
}
