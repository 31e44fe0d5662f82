//! Argument marshaling: native argument tuples to boxed argument arrays.
//!
//! Packing applies each element's converter positionally, strictly in
//! declaration order - converters may allocate (wrapper proxies), and a
//! failure must be attributable to a specific parameter. The inverse
//! direction is per-value [`FromManaged`], used for invoke results and for
//! the bridge's argument array.

use crate::convert::ToManaged;
use crate::error::ConversionError;
use crate::runtime::domain::Domain;
use crate::signature::{TypeToken, derive_signature};
use crate::value::ManagedValue;

/// A native argument tuple that can cross the boundary.
///
/// Implemented for tuples of up to eight [`ToManaged`] elements.
pub trait ArgPack {
    /// Number of arguments.
    const ARITY: usize;

    /// Derive the argument-type signature: `(signature, all_types_known)`.
    fn signature() -> (String, bool);

    /// Convert into the boxed argument array, in declaration order.
    fn pack(self, domain: &Domain) -> Result<Vec<ManagedValue>, ConversionError>;
}

macro_rules! impl_arg_pack {
    ($count:expr $(, $A:ident $a:ident)*) => {
        impl<$($A),*> ArgPack for ($($A,)*)
        where
            $($A: ToManaged,)*
        {
            const ARITY: usize = $count;

            fn signature() -> (String, bool) {
                derive_signature(&[$(<$A as TypeToken>::TOKEN),*])
            }

            #[allow(unused_variables, unused_mut)]
            fn pack(self, domain: &Domain) -> Result<Vec<ManagedValue>, ConversionError> {
                let ($($a,)*) = self;
                let mut packed = Vec::with_capacity($count);
                $(packed.push($a.to_managed(domain)?);)*
                Ok(packed)
            }
        }
    };
}

impl_arg_pack!(0);
impl_arg_pack!(1, A0 a0);
impl_arg_pack!(2, A0 a0, A1 a1);
impl_arg_pack!(3, A0 a0, A1 a1, A2 a2);
impl_arg_pack!(4, A0 a0, A1 a1, A2 a2, A3 a3);
impl_arg_pack!(5, A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
impl_arg_pack!(6, A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_arg_pack!(7, A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_arg_pack!(8, A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
