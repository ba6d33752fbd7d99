use proc_macro::TokenStream;

mod payload;

/// Generates the implementation block for conforming to `Payload`.
///
/// Structs encode their fields in declaration order. Enums must carry a
/// `#[repr(...)]` attribute; the discriminant is encoded first, followed
/// by the fields of the active variant.
///
/// Every type parameter receives a `Payload` bound.
///
/// # Note
///
/// Requires `can_ha_payload` to be in scope with that name.
#[proc_macro_derive(Payload)]
pub fn payload(item: TokenStream) -> TokenStream {
    payload::derive(item)
}
