use std::fmt::{Display, Formatter, Write};

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;

use crate::abi::HostAbi;
use crate::error::{ValueError, ValueResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StrumDisplay, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ScalarType {
    Int64,
    Float64,
    Bool,
}

impl ScalarType {
    pub fn c_type(&self) -> &'static str {
        match self {
            ScalarType::Int64 => "int64_t",
            ScalarType::Float64 => "double",
            ScalarType::Bool => "bool",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeType {
    /// Pointer to a host object.
    Handle,
    Scalar(ScalarType),
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Name under which the compiler binds a value node in generated code.
/// The native variable is named after it; the host-visible slot gets the ABI prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeBinding(String);

impl NativeBinding {
    pub fn new(name: impl Into<String>) -> ValueResult<Self> {
        let name = name.into();
        if !is_c_identifier(&name) {
            return Err(ValueError::InvalidArgument(format!(
                "binding name {name:?} is not a C identifier"
            )));
        }
        Ok(NativeBinding(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn native(&self) -> Place {
        Place::Native(self.0.clone())
    }

    pub fn host(&self) -> Place {
        Place::Host(self.0.clone())
    }
}

impl Display for NativeBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Jump target in generated code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> ValueResult<Self> {
        let name = name.into();
        if !is_c_identifier(&name) {
            return Err(ValueError::InvalidArgument(format!(
                "label {name:?} is not a C identifier"
            )));
        }
        Ok(Label(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Place {
    Native(String),
    /// Host-visible slot for a binding.
    Host(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NativeLiteral {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl NativeLiteral {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            NativeLiteral::Int(_) => ScalarType::Int64,
            NativeLiteral::Float(_) => ScalarType::Float64,
            NativeLiteral::Bool(_) => ScalarType::Bool,
        }
    }
}

impl Display for NativeLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            NativeLiteral::Int(i64::MIN) => f.write_str("(-INT64_MAX - 1)"),
            NativeLiteral::Int(value) => write!(f, "INT64_C({value})"),
            NativeLiteral::Float(value) if value.is_nan() => f.write_str("NAN"),
            NativeLiteral::Float(value) if value.is_infinite() => {
                if value > 0.0 {
                    f.write_str("INFINITY")
                } else {
                    f.write_str("(-INFINITY)")
                }
            }
            NativeLiteral::Float(value) => write!(f, "{value:?}"),
            NativeLiteral::Bool(value) => f.write_str(if value { "true" } else { "false" }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Comment(String),
    /// Handles start out null, scalars zeroed.
    Declare {
        var: String,
        ty: NativeType,
    },
    XIncRef(Place),
    XDecRef(Place),
    /// Copies a handle without touching reference counts.
    Assign {
        dst: Place,
        src: Place,
    },
    Clear(Place),
    /// Type-checks `src`; on mismatch reports through the host error channel and jumps to `fail`.
    Unbox {
        dst: String,
        src: Place,
        ty: ScalarType,
        fail: Label,
    },
    /// Stores a new host reference to a boxed copy of `src` into `dst`.
    /// The host leaves `dst` null with its error set when boxing fails.
    Box {
        dst: Place,
        src: String,
        ty: ScalarType,
    },
    GotoIfNull {
        place: Place,
        target: Label,
    },
    Store {
        var: String,
        value: NativeLiteral,
    },
    Label(Label),
    Goto(Label),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NativeBlock(Vec<Stmt>);

impl NativeBlock {
    pub fn new() -> Self {
        NativeBlock(Vec::new())
    }

    pub fn push(&mut self, stmt: Stmt) -> &mut Self {
        self.0.push(stmt);
        self
    }

    pub fn append(&mut self, other: NativeBlock) -> &mut Self {
        self.0.extend(other.0);
        self
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Labels defined in this block, in order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.0.iter().filter_map(|stmt| match stmt {
            Stmt::Label(label) => Some(label),
            _ => None,
        })
    }

    pub fn render(&self, abi: &HostAbi) -> NativeCode {
        let mut out = String::new();
        for stmt in self.0.iter() {
            render_stmt(&mut out, stmt, abi).expect("Failed to write to a String");
        }
        NativeCode(out)
    }
}

impl From<Vec<Stmt>> for NativeBlock {
    fn from(stmts: Vec<Stmt>) -> Self {
        NativeBlock(stmts)
    }
}

fn render_place(place: &Place, abi: &HostAbi) -> String {
    match place {
        Place::Native(var) => var.clone(),
        Place::Host(binding) => format!("{}{}", abi.host_prefix, binding),
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, abi: &HostAbi) -> std::fmt::Result {
    match stmt {
        Stmt::Comment(text) => writeln!(out, "/* {} */", text.replace("*/", "* /")),
        Stmt::Declare {
            var,
            ty: NativeType::Handle,
        } => writeln!(out, "{} {} = {};", abi.handle_type, var, abi.null),
        Stmt::Declare {
            var,
            ty: NativeType::Scalar(ty),
        } => writeln!(out, "{} {} = 0;", ty.c_type(), var),
        Stmt::XIncRef(place) => writeln!(out, "{}({});", abi.xincref, render_place(place, abi)),
        Stmt::XDecRef(place) => writeln!(out, "{}({});", abi.xdecref, render_place(place, abi)),
        Stmt::Assign { dst, src } => writeln!(
            out,
            "{} = {};",
            render_place(dst, abi),
            render_place(src, abi)
        ),
        Stmt::Clear(place) => writeln!(out, "{} = {};", render_place(place, abi), abi.null),
        Stmt::Unbox { dst, src, ty, fail } => {
            let src = render_place(src, abi);
            let indent = " ".repeat(abi.indent_width);
            writeln!(out, "if (!{}{}({})) {{", abi.check_prefix, ty, src)?;
            writeln!(out, "{indent}{}(\"{}\", \"{}\");", abi.type_error, dst, ty)?;
            writeln!(out, "{indent}goto {fail};")?;
            writeln!(out, "}}")?;
            writeln!(out, "{} = {}{}({});", dst, abi.unbox_prefix, ty, src)
        }
        Stmt::Box { dst, src, ty } => writeln!(
            out,
            "{} = {}{}({});",
            render_place(dst, abi),
            abi.box_prefix,
            ty,
            src
        ),
        Stmt::GotoIfNull { place, target } => {
            let indent = " ".repeat(abi.indent_width);
            writeln!(out, "if ({} == {}) {{", render_place(place, abi), abi.null)?;
            writeln!(out, "{indent}goto {target};")?;
            writeln!(out, "}}")
        }
        Stmt::Store { var, value } => writeln!(out, "{var} = {value};"),
        Stmt::Label(label) => writeln!(out, "{label}:;"),
        Stmt::Goto(label) => writeln!(out, "goto {label};"),
    }
}

/// Rendered C source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCode(String);

impl NativeCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn contains(&self, pat: &str) -> bool {
        self.0.contains(pat)
    }
}

impl Display for NativeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
