use core::any::Any;

use crate::Reflect;
use crate::catalog::{Describe, PolymorphicShape, TypeDescriptor, TypeKind};

fn view(value: &dyn Any) -> Option<&dyn Reflect> {
    let boxed = value.downcast_ref::<Box<dyn Reflect>>()?;
    Some((**boxed).as_reflect())
}

/// Holds a value of any registered type.
impl Describe for Box<dyn Reflect> {
    fn describe() -> TypeDescriptor {
        let shape = PolymorphicShape {
            view,
            universal: true,
            implementors: Vec::new(),
        };
        TypeDescriptor::builtin::<Self>("Object", TypeKind::Polymorphic(shape))
    }
}

/// Implements [`Describe`](crate::Describe) for `Box<dyn Trait>`, a
/// polymorphic type holding any of the listed implementors.
///
/// `Trait` must have [`Reflect`](crate::Reflect) as a supertrait.
///
/// ```
/// use exs_core::{Reflect, describe_polymorphic};
/// # use exs_core::{Describe, MemberDescriptor, TypeDescriptor};
///
/// trait Shape: Reflect {}
///
/// #[derive(Default)]
/// struct Circle {
///     radius: f64,
/// }
///
/// impl Shape for Circle {}
/// # impl Describe for Circle {
/// #     fn describe() -> TypeDescriptor {
/// #         TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, f64>(
/// #             "Radius",
/// #             |c| &c.radius,
/// #             |c| &mut c.radius,
/// #         )])
/// #         .with_default::<Self>()
/// #     }
/// # }
///
/// describe_polymorphic!(Shape, "Shape", [Circle]);
/// ```
#[macro_export]
macro_rules! describe_polymorphic {
    ($trait:path, $name:literal, [$($implementor:ty),* $(,)?]) => {
        impl $crate::Describe for ::std::boxed::Box<dyn $trait> {
            fn describe() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::polymorphic::<Self>(
                    $name,
                    |value| {
                        value
                            .downcast_ref::<Self>()
                            .map(|boxed| $crate::Reflect::as_reflect(&**boxed))
                    },
                    ::std::vec![$(
                        $crate::Implementor::new::<$implementor, Self>(|c| ::std::boxed::Box::new(c))
                    ),*],
                )
            }
        }
    };
}
