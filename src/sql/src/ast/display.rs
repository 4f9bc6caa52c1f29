// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Formatting machinery for AST nodes.
//!
//! `AstDisplay` is an alternative to `fmt::Display` that threads a
//! formatting mode through the tree. `Simple` prints for humans,
//! quoting identifiers only when required; `Stable` quotes every
//! identifier and is the form persisted in descriptors (notably a
//! view's stored query), so that the stored text never changes meaning
//! under a different session.

use std::fmt;

/// Describes the context in which to print an AST.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatMode {
    /// Print for human consumption; quote only when necessary.
    Simple,
    /// Print for persistence; quote all identifiers.
    Stable,
}

#[derive(Debug)]
pub struct AstFormatter<W> {
    buf: W,
    mode: FormatMode,
}

impl<W> AstFormatter<W>
where
    W: fmt::Write,
{
    pub fn new(buf: W, mode: FormatMode) -> AstFormatter<W> {
        AstFormatter { buf, mode }
    }

    pub fn write_node<T: AstDisplay>(&mut self, s: &T) {
        s.fmt(self);
    }

    pub fn write_str<T: fmt::Display>(&mut self, s: T) {
        write!(self.buf, "{}", s).expect("unexpected error in fmt::Display implementation");
    }

    /// Whether the output is optimized for persistence.
    pub fn stable(&self) -> bool {
        self.mode == FormatMode::Stable
    }
}

/// An alternative to `fmt::Display` for formatting ASTs.
pub trait AstDisplay {
    fn fmt<W>(&self, f: &mut AstFormatter<W>)
    where
        W: fmt::Write;

    fn to_ast_string(&self) -> String {
        let mut buf = String::new();
        let mut f = AstFormatter::new(&mut buf, FormatMode::Simple);
        self.fmt(&mut f);
        buf
    }

    fn to_ast_string_stable(&self) -> String {
        let mut buf = String::new();
        let mut f = AstFormatter::new(&mut buf, FormatMode::Stable);
        self.fmt(&mut f);
        buf
    }
}

pub struct DisplaySeparated<'a, T>
where
    T: AstDisplay,
{
    slice: &'a [T],
    sep: &'static str,
}

impl<'a, T> AstDisplay for DisplaySeparated<'a, T>
where
    T: AstDisplay,
{
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        let mut delim = "";
        for t in self.slice {
            f.write_str(delim);
            delim = self.sep;
            t.fmt(f);
        }
    }
}

pub fn separated<'a, T>(slice: &'a [T], sep: &'static str) -> DisplaySeparated<'a, T>
where
    T: AstDisplay,
{
    DisplaySeparated { slice, sep }
}

pub fn comma_separated<T>(slice: &[T]) -> DisplaySeparated<'_, T>
where
    T: AstDisplay,
{
    DisplaySeparated { slice, sep: ", " }
}

/// Doubles any single quotes in `s` for embedding in a string literal.
pub fn escape_single_quote_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Implements `fmt::Display` in terms of `AstDisplay` (simple mode).
macro_rules! impl_display {
    ($name:ident) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                use $crate::ast::display::AstDisplay;
                f.write_str(&self.to_ast_string())
            }
        }
    };
}

pub(crate) use impl_display;
