//! Typed access to the untagged variant union
//!
//! The union carries no discriminant, so every read is unsafe and the caller
//! vouches for which member is live. Writes go through constructors that
//! zero the full cell first, so the bytes beyond the active member are defined.

use std::ffi::{ c_char, c_int };
use std::mem;

use crate::ffi::{ RawList, RawValue };


/// One variant cell, sized and aligned for the widest member.
#[derive( Clone, Copy )]
pub(crate) struct VariantValue {
    raw: RawValue,
}


impl VariantValue {
    /// An all-zero cell, ready to be filled in by the engine.
    pub fn zeroed() -> Self {
        // SAFETY: every member of the union is valid when all bits are zero
        // (integers, floats and null pointers).
        Self { raw: unsafe { mem::zeroed() } }
    }


    pub fn from_int( value: i32 ) -> Self {
        let mut cell = Self::zeroed();
        cell.raw.i_int = value as c_int;
        cell
    }


    pub fn from_bool( value: bool ) -> Self {
        let mut cell = Self::zeroed();
        cell.raw.b_bool = value as c_int;
        cell
    }


    pub fn from_float( value: f32 ) -> Self {
        let mut cell = Self::zeroed();
        cell.raw.f_float = value;
        cell
    }


    /// Wraps a borrowed string pointer; the cell does not own it.
    pub fn from_string_ptr( value: *const c_char ) -> Self {
        let mut cell = Self::zeroed();
        cell.raw.psz_string = value.cast_mut();
        cell
    }


    pub fn from_raw( raw: RawValue ) -> Self {
        Self { raw }
    }


    /// # Safety
    ///
    /// The integer member must be the live one.
    pub unsafe fn int( &self ) -> i32 {
        self.raw.i_int
    }


    /// # Safety
    ///
    /// The boolean member must be the live one.
    pub unsafe fn bool( &self ) -> bool {
        self.raw.b_bool != 0
    }


    /// # Safety
    ///
    /// The float member must be the live one.
    pub unsafe fn float( &self ) -> f32 {
        self.raw.f_float
    }


    /// # Safety
    ///
    /// The string member must be the live one.
    pub unsafe fn string_ptr( &self ) -> *mut c_char {
        self.raw.psz_string
    }


    /// # Safety
    ///
    /// The list member must be the live one.
    pub unsafe fn list( &self ) -> *mut RawList {
        self.raw.p_list
    }


    /// Object id of the name/id overlay, stored right after the name pointer.
    ///
    /// # Safety
    ///
    /// The name/id member must be the live one.
    pub unsafe fn object_id( &self ) -> i32 {
        self.raw.var.i_object_id
    }


    pub fn as_mut_ptr( &mut self ) -> *mut RawValue {
        &mut self.raw
    }


    pub fn into_raw( self ) -> RawValue {
        self.raw
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::ffi::RawVarRef;
    use std::ffi::CString;
    use std::ptr;


    #[test]
    fn test_scalar_members() {
        unsafe {
            assert_eq!( VariantValue::from_int( -42 ).int(), -42 );
            assert!( VariantValue::from_bool( true ).bool() );
            assert!( !VariantValue::from_bool( false ).bool() );
            assert_eq!( VariantValue::from_float( 1.5 ).float(), 1.5 );
        }
    }


    #[test]
    fn test_zeroed_reads_as_empty() {
        let cell = VariantValue::zeroed();
        unsafe {
            assert_eq!( cell.int(), 0 );
            assert!( !cell.bool() );
            assert!( cell.string_ptr().is_null() );
            assert!( cell.list().is_null() );
        }
    }


    #[test]
    fn test_string_pointer_is_borrowed() {
        let owned = CString::new( "dummy" ).unwrap();
        let cell = VariantValue::from_string_ptr( owned.as_ptr() );
        assert_eq!( unsafe { cell.string_ptr() } as *const c_char, owned.as_ptr() );
    }


    #[test]
    fn test_object_id_overlay() {
        let raw = RawValue {
            var: RawVarRef { psz_name: ptr::null_mut(), i_object_id: 17 },
        };
        let cell = VariantValue::from_raw( raw );
        assert_eq!( unsafe { cell.object_id() }, 17 );
    }
}
