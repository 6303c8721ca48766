//! # Dynamic Platform Configuration Repository
//!
//! This crate provides the in-memory object store that platform firmware uses
//! to describe the machine (interrupt controllers, timers, IORT nodes, PCI
//! host bridges, caches, ...) before the ACPI and SMBIOS table generators run.
//!
//! ## Overview
//!
//! Platform code submits configuration-manager objects one by one while the
//! repository is open. Each object gets a [`Token`], an opaque handle other
//! objects can use to reference it. Once the platform description is complete
//! the repository is finalized: all objects of the same kind are packed into
//! one contiguous array, and a [`TokenMapper`] remembers where each individual
//! object ended up.
//!
//! ```text
//! platform init ──add_object()──▶ DynamicPlatformRepository ◀──get_object()── table generators
//!                                   │        │
//!                          TokenGenerator  TokenMapper
//!                                   │
//!                           fixup_self_token (Arm IORT nodes)
//! ```
//!
//! ## Key Components
//!
//! ### Identifiers ([`object_id`])
//! * **Composite id**: namespace in bits 28–31, type id in bits 0–7
//! * **Namespaces**: [`Namespace::Arm`], [`Namespace::RiscV`], [`Namespace::ArchCommon`]
//! * **Closed enumerations**: one per namespace; `COUNT` is the namespace maximum
//! * **Cross-references**: [`CM_REF`] is the only kind that may hold several elements
//!
//! ### Tokens ([`token`])
//! * [`TokenGenerator`] hands out strictly increasing tokens, never [`Token::NULL`]
//! * The generator is owned by the repository; there is no global counter
//!
//! ### Token Mapper ([`token_mapper`])
//! * Fixed capacity, set once
//! * Composite `(token, identifier)` key, linear lookup
//! * Stores references to data owned elsewhere, never copies
//!
//! ### Repository ([`repository`])
//! * **Transient** phase: objects are copied into per-type lists
//! * **Finalized** phase: per-type grouped arrays plus token lookup
//! * One-way transition; out-of-phase calls are rejected without side effects
//!
//! ## Error Handling
//!
//! All operations return [`RepoError`]. With the `uefi` feature (default) the
//! error converts into the matching `uefi::Status`.
//!
//! ## Logging
//!
//! Diagnostics are emitted through the `log` facade. The crate never installs a
//! logger; the firmware image linking it decides where messages go.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod descriptor;
pub mod error;
pub mod object_id;
pub mod repository;
pub mod self_token;
pub mod token;
pub mod token_mapper;

pub use descriptor::{CROSS_REF_SIZE, ObjectDescriptor, encode_references};
pub use error::RepoError;
pub use object_id::{
    ArchCommonObjectType, ArmObjectType, CM_REF, Namespace, ObjectId, RiscVObjectType,
};
pub use repository::{DynamicPlatformRepository, RepoState};
pub use self_token::fixup_self_token;
pub use token::{Token, TokenGenerator};
pub use token_mapper::{ObjectData, TokenMapEntry, TokenMapper};
