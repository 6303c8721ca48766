//! # Self-Token Fix-Up
//!
//! Some Arm object kinds (the IORT nodes) embed their own token so that other
//! objects can reference them. The producer cannot know the token before the
//! repository mints it, so the repository patches the copied payload right
//! after [`add_object`](crate::DynamicPlatformRepository::add_object) assigns
//! one.
//!
//! Every self-referencing node stores the token as its first field:
//!
//! ```text
//! +----------------------+---------------------------+
//! | token (u64, LE)      | node-specific fields ...  |
//! +----------------------+---------------------------+
//! ^ offset 0             ^ offset 8
//! ```

use crate::error::RepoError;
use crate::object_id::{ArmObjectType, Namespace, ObjectId};
use crate::token::Token;
use log::warn;

/// How an object kind relates to its own token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SelfToken {
    /// The payload does not embed its token.
    Absent,
    /// The token is stored little-endian at `offset`.
    Field { offset: usize },
    /// The payload references itself but there is no fixer for it.
    NotImplemented,
}

const fn arm_self_token(kind: ArmObjectType) -> SelfToken {
    match kind {
        ArmObjectType::ItsGroup
        | ArmObjectType::NamedComponent
        | ArmObjectType::RootComplex
        | ArmObjectType::SmmuV1SmmuV2
        | ArmObjectType::SmmuV3 => SelfToken::Field { offset: 0 },
        ArmObjectType::Pmcg | ArmObjectType::Rmr => SelfToken::NotImplemented,
        _ => SelfToken::Absent,
    }
}

/// Write `token` into the self-reference field of `payload`, if the kind has one.
///
/// Kinds without a self-reference and kinds outside the Arm namespace are left
/// untouched.
///
/// # Errors
/// - [`RepoError::InvalidParameter`] if `payload` is empty, `token` is
///   [`Token::NULL`], `id` is malformed, the Arm type id is out of range, or
///   the payload is too short to hold the token field.
/// - [`RepoError::Unsupported`] if the kind references itself but cannot be
///   fixed up.
pub fn fixup_self_token(id: ObjectId, payload: &mut [u8], token: Token) -> Result<(), RepoError> {
    if payload.is_empty() || token.is_null() {
        return Err(RepoError::InvalidParameter);
    }

    let (namespace, raw) = id.split().ok_or(RepoError::InvalidParameter)?;
    if namespace != Namespace::Arm {
        return Ok(());
    }

    let kind = ArmObjectType::from_raw(raw).ok_or(RepoError::InvalidParameter)?;
    match arm_self_token(kind) {
        SelfToken::Absent => Ok(()),
        SelfToken::Field { offset } => {
            let field = payload
                .get_mut(offset..offset + size_of::<u64>())
                .ok_or(RepoError::InvalidParameter)?;
            field.copy_from_slice(&token.as_u64().to_le_bytes());
            Ok(())
        }
        SelfToken::NotImplemented => {
            warn!("no self-token fixer for {kind:?}");
            Err(RepoError::Unsupported)
        }
    }
}
