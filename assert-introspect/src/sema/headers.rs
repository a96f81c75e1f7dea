//! What the supported standard headers declare

use crate::ast::{CType, IntType};
use crate::tree::FnSig;

/// Headers the front end knows about
pub const KNOWN_HEADERS: &[&str] = &[
    "assert.h",
    "stdbool.h",
    "stddef.h",
    "stdint.h",
    "stdio.h",
    "stdlib.h",
    "string.h",
];

fn sig(ret: CType, params: Vec<CType>, variadic: bool) -> FnSig {
    FnSig { ret, params, variadic }
}

/// Function prototypes a header declares
pub fn functions(header: &str) -> Vec<(&'static str, FnSig)> {
    let str_ = CType::char_ptr;
    match header {
        "stdio.h" => vec![
            ("printf", sig(CType::int(), vec![str_()], true)),
            ("snprintf", sig(CType::int(), vec![str_(), CType::size_t(), str_()], true)),
            ("puts", sig(CType::int(), vec![str_()], false)),
        ],
        "stdlib.h" => vec![
            ("abort", sig(CType::Void, vec![], false)),
            ("exit", sig(CType::Void, vec![CType::int()], false)),
            ("abs", sig(CType::int(), vec![CType::int()], false)),
        ],
        "string.h" => vec![
            ("strlen", sig(CType::size_t(), vec![str_()], false)),
            ("strcmp", sig(CType::int(), vec![str_(), str_()], false)),
            ("strstr", sig(str_(), vec![str_(), str_()], false)),
        ],
        "assert.h" => vec![(
            "__assert_fail",
            sig(
                CType::Void,
                vec![str_(), str_(), CType::Int(IntType::UINT), str_()],
                false,
            ),
        )],
        _ => vec![],
    }
}

/// Whether the header defines `NULL`
pub fn defines_null(header: &str) -> bool {
    matches!(header, "stddef.h" | "stdio.h" | "stdlib.h" | "string.h")
}

/// Whether the header defines `true` and `false`
pub fn defines_bool_constants(header: &str) -> bool {
    header == "stdbool.h"
}

/// Extract the header name from the text of an `#include` line
pub fn include_target(directive: &str) -> Option<&str> {
    let rest = directive.strip_prefix("include")?.trim();
    let inner = rest
        .strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .or_else(|| rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')))?;
    Some(inner.trim())
}
