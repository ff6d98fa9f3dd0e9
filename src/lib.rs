#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use exs_core as engine;
pub use exs_document as document;
pub use exs_utils as utils;

pub use exs_core::{
    Configuration, ConfigurationBuilder, ContentSerializer, Describe, Error, Extension,
    MemberDescriptor, Predicate, Reflect, Result, Serializer, Shared, TypeDescriptor,
    describe_polymorphic, shared,
};
