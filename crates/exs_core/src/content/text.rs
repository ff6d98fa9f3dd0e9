use core::any::{Any, type_name};
use core::fmt::{Debug, Display};
use core::marker::PhantomData;
use core::str::FromStr;

use crate::content::{TextConverter, mismatch};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// DisplayText

/// Text through [`Display`] and [`FromStr`].
pub struct DisplayText<T>(PhantomData<fn() -> T>);

impl<T> DisplayText<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DisplayText<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TextConverter for DisplayText<T>
where
    T: Any + Display + FromStr,
    T::Err: Display,
{
    fn format(&self, value: &dyn Any) -> Result<String> {
        value
            .downcast_ref::<T>()
            .map(ToString::to_string)
            .ok_or_else(|| mismatch(type_name::<T>()))
    }

    fn parse(&self, text: &str) -> Result<Box<dyn Any>> {
        match text.parse::<T>() {
            Ok(value) => Ok(Box::new(value)),
            Err(e) => Err(Error::format(type_name::<T>(), format!("`{text}`: {e}"))),
        }
    }
}

// -----------------------------------------------------------------------------
// FloatText

/// Floating point text: shortest round-trip digits, `NaN`, `INF` and `-INF`.
pub struct FloatText<T>(PhantomData<fn() -> T>);

impl<T> FloatText<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

/// Implemented for `f32` and `f64`.
pub trait Float: Any + Debug + FromStr + Copy {
    fn is_nan(self) -> bool;
    fn is_infinite(self) -> bool;
    fn is_sign_negative(self) -> bool;
    const NAN: Self;
    const INFINITY: Self;
    const NEG_INFINITY: Self;
}

macro_rules! impl_float {
    ($($ty:ident),*) => {$(
        impl Float for $ty {
            #[inline]
            fn is_nan(self) -> bool { $ty::is_nan(self) }
            #[inline]
            fn is_infinite(self) -> bool { $ty::is_infinite(self) }
            #[inline]
            fn is_sign_negative(self) -> bool { $ty::is_sign_negative(self) }
            const NAN: Self = $ty::NAN;
            const INFINITY: Self = $ty::INFINITY;
            const NEG_INFINITY: Self = $ty::NEG_INFINITY;
        }
    )*};
}

impl_float!(f32, f64);

impl<T: Float> TextConverter for FloatText<T>
where
    T::Err: Display,
{
    fn format(&self, value: &dyn Any) -> Result<String> {
        let value = *value
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch(type_name::<T>()))?;
        Ok(if value.is_nan() {
            "NaN".to_owned()
        } else if value.is_infinite() {
            let text = if value.is_sign_negative() { "-INF" } else { "INF" };
            text.to_owned()
        } else {
            // `Debug` keeps the shortest round-trip digits and switches to
            // exponent form for very large or small magnitudes.
            format!("{value:?}")
        })
    }

    fn parse(&self, text: &str) -> Result<Box<dyn Any>> {
        let value = match text.trim() {
            "NaN" => T::NAN,
            "INF" => T::INFINITY,
            "-INF" => T::NEG_INFINITY,
            other => other
                .parse::<T>()
                .map_err(|e| Error::format(type_name::<T>(), format!("`{text}`: {e}")))?,
        };
        Ok(Box::new(value))
    }
}

// -----------------------------------------------------------------------------
// EnumText

/// Unit enum variants by name.
pub struct EnumText<T> {
    variants: Vec<(&'static str, T)>,
}

impl<T> EnumText<T> {
    #[inline]
    pub fn new(variants: Vec<(&'static str, T)>) -> Self {
        Self { variants }
    }
}

impl<T> TextConverter for EnumText<T>
where
    T: Any + Copy + PartialEq + Send + Sync,
{
    fn format(&self, value: &dyn Any) -> Result<String> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch(type_name::<T>()))?;
        self.variants
            .iter()
            .find(|(_, variant)| variant == value)
            .map(|(name, _)| (*name).to_owned())
            .ok_or_else(|| Error::contract(format!("`{}` has an unlisted variant", type_name::<T>())))
    }

    fn parse(&self, text: &str) -> Result<Box<dyn Any>> {
        self.variants
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, variant)| Box::new(*variant) as Box<dyn Any>)
            .ok_or_else(|| Error::format(type_name::<T>(), format!("unknown variant `{text}`")))
    }
}
