use std::sync::Arc;

use crate::catalog::{Describe, TypeDescriptor};
use crate::content::{DisplayText, FloatText, TextContent};

macro_rules! impl_display_leaf {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl Describe for $ty {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::leaf::<Self>($name, Arc::new(TextContent(DisplayText::<Self>::new())))
            }
        }
    )*};
}

impl_display_leaf! {
    bool => "boolean",
    char => "char",
    i8 => "sbyte",
    i16 => "short",
    i32 => "int",
    i64 => "long",
    i128 => "int128",
    isize => "nint",
    u8 => "unsignedByte",
    u16 => "unsignedShort",
    u32 => "unsignedInt",
    u64 => "unsignedLong",
    u128 => "unsignedInt128",
    usize => "nuint",
    String => "string",
}

impl Describe for f32 {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::leaf::<Self>("float", Arc::new(TextContent(FloatText::<Self>::new())))
    }
}

impl Describe for f64 {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::leaf::<Self>("double", Arc::new(TextContent(FloatText::<Self>::new())))
    }
}
