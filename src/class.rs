use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::function::LoxFunction;
use crate::interpreter::{Interpreter, Signal};
use crate::value::Value;

/// A class value: methods table, optional superclass, and a metaclass whose
/// methods are the class's static methods.  Classes are callable
/// (construction) and instance-like (property access goes through the
/// metaclass).
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
    pub metaclass: Option<Rc<LoxClass>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
        metaclass: Option<Rc<LoxClass>>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
            metaclass,
        }
    }

    /// Look up a method on this class, walking up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's arity is its initializer's, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Construction: a fresh instance, with `init` bound and invoked when
    /// the class declares one.
    pub fn call<W: Write>(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, Signal> {
        debug!("Constructing instance of {}", class.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, arguments, line)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance: a class handle plus mutable fields.
#[derive(Debug)]
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
