//! provision-manifest: instrucciones tipadas, builder inmutable y codec de cable.
pub mod builder;
pub mod codec;
pub mod error;
pub mod instruction;
pub mod metadata;
pub mod render;
pub mod roles;
pub mod value;

pub use builder::ManifestBuilder;
pub use codec::{decode_manifest, decode_value, encode_manifest, encode_value};
pub use error::ManifestError;
pub use instruction::{FungibleResourceDefinition, Instruction, Manifest, NonFungibleResourceDefinition};
pub use metadata::{FieldKind, MetadataConfig, MetadataEntry, MetadataValue, NonFungibleIdType, NonFungibleSchema};
pub use render::{render_instruction, render_manifest, render_value};
pub use roles::{AccessRule, AccessRuleNode, FungibleResourceRoles, NonFungibleResourceRoles, OwnerRole, ProofRule, ResourceOrNonFungible,
                RoleAssignment};
pub use value::{Address, BlobRef, Decimal, EntityKind, Expression, FromManifestValue, ManifestValue, ToManifestValue, ValueKind,
                BECH32_CHARSET};
