//! Status codes returned across the operator boundary

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Raw code for success
pub const STATUS_SUCCESS: i32 = 0;

/// A non-success status from an operator call
///
/// Discriminants follow the library's status table; codes outside the table
/// are kept verbatim in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
pub enum OpStatus {
    #[error("internal error")]
    InternalError,
    #[error("not implemented")]
    NotImplemented,
    #[error("bad parameter")]
    BadParam,
    #[error("null pointer")]
    NullPointer,
    #[error("device type not supported")]
    DeviceTypeNotSupported,
    #[error("device not found")]
    DeviceNotFound,
    #[error("bad tensor dtype")]
    BadTensorDtype,
    #[error("bad tensor shape")]
    BadTensorShape,
    #[error("bad tensor strides")]
    BadTensorStrides,
    #[error("insufficient workspace")]
    InsufficientWorkspace,
    #[error("unknown status code {0}")]
    Unknown(i32),
}

impl OpStatus {
    pub fn code(self) -> i32 {
        match self {
            OpStatus::InternalError => 1,
            OpStatus::NotImplemented => 2,
            OpStatus::BadParam => 3,
            OpStatus::NullPointer => 4,
            OpStatus::DeviceTypeNotSupported => 5,
            OpStatus::DeviceNotFound => 6,
            OpStatus::BadTensorDtype => 10,
            OpStatus::BadTensorShape => 11,
            OpStatus::BadTensorStrides => 12,
            OpStatus::InsufficientWorkspace => 13,
            OpStatus::Unknown(code) => code,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            1 => OpStatus::InternalError,
            2 => OpStatus::NotImplemented,
            3 => OpStatus::BadParam,
            4 => OpStatus::NullPointer,
            5 => OpStatus::DeviceTypeNotSupported,
            6 => OpStatus::DeviceNotFound,
            10 => OpStatus::BadTensorDtype,
            11 => OpStatus::BadTensorShape,
            12 => OpStatus::BadTensorStrides,
            13 => OpStatus::InsufficientWorkspace,
            other => OpStatus::Unknown(other),
        }
    }

    /// Turn a raw return code into a result; zero is success
    pub fn check(code: i32) -> OpResult<()> {
        if code == STATUS_SUCCESS {
            Ok(())
        } else {
            Err(OpStatus::from_code(code))
        }
    }
}

pub type OpResult<T> = Result<T, OpStatus>;

/// Which step of the operator lifecycle a status came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleCall {
    CreateDescriptor,
    WorkspaceSize,
    Execute,
    Synchronize,
    DestroyDescriptor,
}

impl fmt::Display for LifecycleCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleCall::CreateDescriptor => "create descriptor",
            LifecycleCall::WorkspaceSize => "workspace size query",
            LifecycleCall::Execute => "execute",
            LifecycleCall::Synchronize => "synchronize",
            LifecycleCall::DestroyDescriptor => "destroy descriptor",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_code() {
        assert_eq!(OpStatus::check(0), Ok(()));
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(OpStatus::check(3), Err(OpStatus::BadParam));
        assert_eq!(OpStatus::check(13), Err(OpStatus::InsufficientWorkspace));
        assert_eq!(OpStatus::BadTensorShape.code(), 11);
    }

    #[test]
    fn test_unknown_code_preserved() {
        assert_eq!(OpStatus::check(42), Err(OpStatus::Unknown(42)));
        assert_eq!(OpStatus::Unknown(42).code(), 42);
        assert_eq!(OpStatus::Unknown(-7).to_string(), "unknown status code -7");
    }

    #[test]
    fn test_every_table_code_round_trips() {
        for code in [1, 2, 3, 4, 5, 6, 10, 11, 12, 13] {
            let status = OpStatus::check(code).unwrap_err();
            assert!(!matches!(status, OpStatus::Unknown(_)));
            assert_eq!(status.code(), code);
        }
    }
}
