//! C ABI for embedding (spec §6 "C ABI exposed by the parser"): the same
//! contract [`crate::json_export`] backs, exposed over raw pointers for a
//! host process that links this crate as a shared library instead of
//! depending on it as a Rust crate. This is the only module in the crate
//! that touches `unsafe` (see the `unsafe_code` lint override in
//! `Cargo.toml`), and it stays as thin as possible: convert C strings in,
//! call into safe Rust, convert `CString`s back out.
#![allow(unsafe_code)]

use crate::ast::Statement;
use crate::imports::ImportResolver;
use crate::parser::parse_program;
use crate::rewrite::rewrite_program;
use crate::span::SourceBuffer;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

/// Parse (and, if `full`, resolve imports and run every rewrite pass over)
/// `program_text`, writing the spec §6 JSON export to `*out_json` on success
/// or an error message to `*out_err` on failure. Exactly one of the two
/// out-pointers receives a non-null, caller-owned string; the other is set
/// to null. Both out-pointers must be non-null and must not already point at
/// live data — any previous value is overwritten, not freed.
///
/// # Safety
/// `program_text`, `file_name`, and `logicapath` must each be either null or
/// a valid pointer to a null-terminated, UTF-8 C string that outlives this
/// call. `out_json` and `out_err` must be valid, writable pointers.
#[no_mangle]
pub unsafe extern "C" fn parse_rules_json(
    program_text: *const c_char,
    file_name: *const c_char,
    logicapath: *const c_char,
    full: bool,
    out_json: *mut *mut c_char,
    out_err: *mut *mut c_char,
) -> bool {
    *out_json = ptr::null_mut();
    *out_err = ptr::null_mut();

    let result = (|| -> Result<String, String> {
        let program_text = cstr_to_str(program_text, "program_text")?;
        let file_name = cstr_to_str(file_name, "file_name").unwrap_or("<inline>");
        let logicapath = cstr_to_str(logicapath, "logicapath").unwrap_or_default();
        let import_roots: Vec<PathBuf> = logicapath.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect();

        let buffer = Arc::new(SourceBuffer::new(file_name, program_text));
        let parsed = parse_program(buffer).map_err(|e| e.to_string())?;
        let original_statements = parsed.statements.clone();

        let rules: Vec<crate::ast::Rule> = if full {
            let mut resolver = ImportResolver::new(&import_roots);
            let statements = resolver.resolve(parsed).map_err(|e| e.to_string())?;
            rewrite_program(statements).map_err(|e| e.to_string())?
        } else {
            parsed
                .statements
                .into_iter()
                .filter_map(|s| match s {
                    Statement::Rule(r) => Some(r),
                    _ => None,
                })
                .collect()
        };

        let json = crate::json_export::export_program(&original_statements, &rules, file_name);
        serde_json::to_string(&json).map_err(|e| e.to_string())
    })();

    match result {
        Ok(json) => {
            *out_json = string_to_c(json);
            true
        }
        Err(err) => {
            *out_err = string_to_c(err);
            false
        }
    }
}

/// Free a string returned by [`parse_rules_json`]. A null pointer is a no-op.
///
/// # Safety
/// `ptr` must either be null or have been returned by [`parse_rules_json`]
/// and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn logica_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char, field: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{field} must not be null"));
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| format!("{field} is not valid UTF-8"))
}

fn string_to_c(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_else(|_| CString::new("<string contained an interior NUL>").unwrap()).into_raw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_program() {
        let program = CString::new("Parent(a, b) :- Friend(a, b);").unwrap();
        let file = CString::new("t.l").unwrap();
        let mut out_json: *mut c_char = ptr::null_mut();
        let mut out_err: *mut c_char = ptr::null_mut();
        let ok = unsafe { parse_rules_json(program.as_ptr(), file.as_ptr(), ptr::null(), false, &mut out_json, &mut out_err) };
        assert!(ok);
        assert!(out_err.is_null());
        assert!(!out_json.is_null());
        let json = unsafe { CStr::from_ptr(out_json) }.to_str().unwrap();
        assert!(json.contains("\"rule\""));
        unsafe { logica_free_string(out_json) };
    }

    #[test]
    fn reports_parse_errors_via_out_err() {
        let program = CString::new("this is not valid logica :::").unwrap();
        let file = CString::new("t.l").unwrap();
        let mut out_json: *mut c_char = ptr::null_mut();
        let mut out_err: *mut c_char = ptr::null_mut();
        let ok = unsafe { parse_rules_json(program.as_ptr(), file.as_ptr(), ptr::null(), false, &mut out_json, &mut out_err) };
        assert!(!ok);
        assert!(out_json.is_null());
        assert!(!out_err.is_null());
        unsafe { logica_free_string(out_err) };
    }
}
