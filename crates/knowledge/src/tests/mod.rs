mod chunk_properties;
pub(crate) mod support;
