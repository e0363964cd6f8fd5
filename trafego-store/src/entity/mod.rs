//! SeaORM entity definitions for the engine tables.

pub(crate) mod hostname_override;
pub(crate) mod managed_record;
pub(crate) mod provider_cache;
