//! Reference-counting host used to execute native blocks in tests.

use hashbrown::HashMap;
use thiserror::Error;

use crate::native::{NativeBlock, NativeLiteral, NativeType, Place, ScalarType, Stmt};

pub(crate) type ObjId = usize;

const STEP_LIMIT: usize = 100_000;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MockValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Opaque(u64),
}

impl MockValue {
    fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            MockValue::Int(_) => Some(ScalarType::Int64),
            MockValue::Float(_) => Some(ScalarType::Float64),
            MockValue::Bool(_) => Some(ScalarType::Bool),
            MockValue::Opaque(_) => None,
        }
    }
}

#[derive(Debug)]
struct MockObject {
    value: MockValue,
    // zero means freed
    refcount: i64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Slot {
    Handle(Option<ObjId>),
    Scalar(NativeLiteral),
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum MockError {
    #[error("object {0} used after it was freed")]
    UseAfterFree(ObjId),
    #[error("object {0} released more often than acquired")]
    DoubleRelease(ObjId),
    #[error("unknown variable or binding {0}")]
    UnknownVariable(String),
    #[error("unknown label {0}")]
    UnknownLabel(String),
    #[error("variable {0} used with the wrong native type")]
    TypeMismatch(String),
    #[error("step limit exceeded")]
    StepLimit,
}

#[derive(Debug, Default)]
pub(crate) struct Run {
    /// Comments and labels passed, in execution order. Labels are suffixed with `:`.
    pub trace: Vec<String>,
}

impl Run {
    pub fn passed(&self, entry: &str) -> bool {
        self.trace.iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.trace.iter().filter(|e| *e == entry).count()
    }
}

/// Host heap plus the host-visible binding slots. Each slot owns one reference.
#[derive(Debug, Default)]
pub(crate) struct MockHost {
    objects: Vec<MockObject>,
    bindings: HashMap<String, Option<ObjId>>,
    pub errors: Vec<String>,
    /// Boxing yields null and reports an error, like an allocation failure.
    pub fail_boxing: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// New object bound to `name`; the binding owns its only reference.
    pub fn bind_new(&mut self, name: &str, value: MockValue) -> ObjId {
        let obj = self.alloc(value);
        self.bindings.insert(name.to_string(), Some(obj));
        obj
    }

    /// Binds an existing live object, taking a new reference for the slot.
    pub fn bind_shared(&mut self, name: &str, obj: ObjId) {
        assert!(self.objects[obj].refcount > 0, "sharing a freed object");
        self.objects[obj].refcount += 1;
        self.bindings.insert(name.to_string(), Some(obj));
    }

    pub fn bind_null(&mut self, name: &str) {
        self.bindings.insert(name.to_string(), None);
    }

    pub fn binding(&self, name: &str) -> Option<ObjId> {
        self.bindings.get(name).copied().flatten()
    }

    pub fn value(&self, obj: ObjId) -> &MockValue {
        &self.objects[obj].value
    }

    pub fn refcount(&self, obj: ObjId) -> i64 {
        self.objects[obj].refcount
    }

    pub fn is_freed(&self, obj: ObjId) -> bool {
        self.objects[obj].refcount == 0
    }

    fn alloc(&mut self, value: MockValue) -> ObjId {
        self.objects.push(MockObject { value, refcount: 1 });
        self.objects.len() - 1
    }

    /// Every object's count equals the number of binding slots pointing at it.
    pub fn check_balanced(&self) -> Result<(), String> {
        let mut expected = vec![0_i64; self.objects.len()];
        for (name, obj) in self.bindings.iter() {
            if let Some(obj) = obj {
                if self.is_freed(*obj) {
                    return Err(format!("binding {name} points at freed object {obj}"));
                }
                expected[*obj] += 1;
            }
        }
        for (obj, object) in self.objects.iter().enumerate() {
            if object.refcount != expected[obj] {
                return Err(format!(
                    "object {obj} ({:?}) has refcount {}, expected {}",
                    object.value, object.refcount, expected[obj]
                ));
            }
        }
        Ok(())
    }

    pub fn run(&mut self, block: &NativeBlock) -> Result<Run, MockError> {
        let stmts = block.stmts();
        let labels: HashMap<&str, usize> = stmts
            .iter()
            .enumerate()
            .filter_map(|(pc, stmt)| match stmt {
                Stmt::Label(label) => Some((label.as_str(), pc)),
                _ => None,
            })
            .collect();
        let jump = |label: &str| -> Result<usize, MockError> {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| MockError::UnknownLabel(label.to_string()))
        };

        let mut vars: HashMap<String, Slot> = HashMap::new();
        let mut run = Run::default();
        let mut pc = 0;
        let mut steps = 0;

        while pc < stmts.len() {
            steps += 1;
            if steps > STEP_LIMIT {
                return Err(MockError::StepLimit);
            }

            let mut next = pc + 1;
            match &stmts[pc] {
                Stmt::Comment(text) => run.trace.push(text.clone()),
                Stmt::Declare { var, ty } => {
                    let slot = match ty {
                        NativeType::Handle => Slot::Handle(None),
                        NativeType::Scalar(ScalarType::Int64) => Slot::Scalar(NativeLiteral::Int(0)),
                        NativeType::Scalar(ScalarType::Float64) => {
                            Slot::Scalar(NativeLiteral::Float(0.0))
                        }
                        NativeType::Scalar(ScalarType::Bool) => {
                            Slot::Scalar(NativeLiteral::Bool(false))
                        }
                    };
                    vars.insert(var.clone(), slot);
                }
                Stmt::XIncRef(place) => {
                    if let Some(obj) = self.read_handle(&vars, place)? {
                        self.live(obj)?;
                        self.objects[obj].refcount += 1;
                    }
                }
                Stmt::XDecRef(place) => {
                    if let Some(obj) = self.read_handle(&vars, place)? {
                        if self.objects[obj].refcount <= 0 {
                            return Err(MockError::DoubleRelease(obj));
                        }
                        self.objects[obj].refcount -= 1;
                    }
                }
                Stmt::Assign { dst, src } => {
                    let handle = self.read_handle(&vars, src)?;
                    self.write_handle(&mut vars, dst, handle)?;
                }
                Stmt::Clear(place) => self.write_handle(&mut vars, place, None)?,
                Stmt::Unbox { dst, src, ty, fail } => {
                    let value = match self.read_handle(&vars, src)? {
                        Some(obj) => {
                            self.live(obj)?;
                            let value = &self.objects[obj].value;
                            (value.scalar_type() == Some(*ty)).then(|| value.clone())
                        }
                        None => None,
                    };
                    let literal = match value {
                        Some(MockValue::Int(v)) => Some(NativeLiteral::Int(v)),
                        Some(MockValue::Float(v)) => Some(NativeLiteral::Float(v)),
                        Some(MockValue::Bool(v)) => Some(NativeLiteral::Bool(v)),
                        Some(MockValue::Opaque(_)) | None => None,
                    };
                    match literal {
                        Some(literal) => {
                            self.write_scalar(&mut vars, dst, literal)?;
                        }
                        None => {
                            self.errors.push(format!("{dst}: expected {ty}"));
                            next = jump(fail.as_str())?;
                        }
                    }
                }
                Stmt::Box { dst, src, ty } => {
                    let literal = match vars.get(src) {
                        Some(Slot::Scalar(literal)) if literal.scalar_type() == *ty => *literal,
                        Some(_) => return Err(MockError::TypeMismatch(src.clone())),
                        None => return Err(MockError::UnknownVariable(src.clone())),
                    };
                    if self.fail_boxing {
                        self.errors.push(format!("{src}: box failed"));
                        self.write_handle(&mut vars, dst, None)?;
                    } else {
                        let value = match literal {
                            NativeLiteral::Int(v) => MockValue::Int(v),
                            NativeLiteral::Float(v) => MockValue::Float(v),
                            NativeLiteral::Bool(v) => MockValue::Bool(v),
                        };
                        let obj = self.alloc(value);
                        self.write_handle(&mut vars, dst, Some(obj))?;
                    }
                }
                Stmt::GotoIfNull { place, target } => {
                    if self.read_handle(&vars, place)?.is_none() {
                        next = jump(target.as_str())?;
                    }
                }
                Stmt::Store { var, value } => self.write_scalar(&mut vars, var, *value)?,
                Stmt::Label(label) => run.trace.push(format!("{label}:")),
                Stmt::Goto(label) => next = jump(label.as_str())?,
            }
            pc = next;
        }

        Ok(run)
    }

    fn live(&self, obj: ObjId) -> Result<(), MockError> {
        if self.objects[obj].refcount <= 0 {
            return Err(MockError::UseAfterFree(obj));
        }
        Ok(())
    }

    fn read_handle(
        &self,
        vars: &HashMap<String, Slot>,
        place: &Place,
    ) -> Result<Option<ObjId>, MockError> {
        match place {
            Place::Native(var) => match vars.get(var) {
                Some(Slot::Handle(handle)) => Ok(*handle),
                Some(Slot::Scalar(_)) => Err(MockError::TypeMismatch(var.clone())),
                None => Err(MockError::UnknownVariable(var.clone())),
            },
            Place::Host(name) => self
                .bindings
                .get(name)
                .copied()
                .ok_or_else(|| MockError::UnknownVariable(name.clone())),
        }
    }

    fn write_handle(
        &mut self,
        vars: &mut HashMap<String, Slot>,
        place: &Place,
        handle: Option<ObjId>,
    ) -> Result<(), MockError> {
        match place {
            Place::Native(var) => match vars.get_mut(var) {
                Some(Slot::Handle(current)) => *current = handle,
                Some(Slot::Scalar(_)) => return Err(MockError::TypeMismatch(var.clone())),
                None => return Err(MockError::UnknownVariable(var.clone())),
            },
            Place::Host(name) => match self.bindings.get_mut(name) {
                Some(slot) => *slot = handle,
                None => return Err(MockError::UnknownVariable(name.clone())),
            },
        }
        Ok(())
    }

    fn write_scalar(
        &self,
        vars: &mut HashMap<String, Slot>,
        var: &str,
        literal: NativeLiteral,
    ) -> Result<(), MockError> {
        match vars.get_mut(var) {
            Some(Slot::Scalar(current)) if current.scalar_type() == literal.scalar_type() => {
                *current = literal;
                Ok(())
            }
            Some(_) => Err(MockError::TypeMismatch(var.to_string())),
            None => Err(MockError::UnknownVariable(var.to_string())),
        }
    }
}
