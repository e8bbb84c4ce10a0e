//! JSON rendering of IR modules.
//!
//! `toy check --format json` prints a module in this shape so other tools can
//! consume the lowered program without parsing the textual listing.
//!
//! # Examples
//!
//! ```
//! use toy_lang::ir::{IrBuilder, Module, Signature};
//! use toy_lang::output::module_to_json;
//!
//! let mut b = IrBuilder::new(Signature::new("one", vec![]));
//! let one = b.const_f64(1.0);
//! b.ret(one);
//!
//! let mut module = Module::new("demo");
//! module.define(b.finish());
//!
//! let json = module_to_json(&module);
//! assert_eq!(json["functions"][0]["name"], "one");
//! assert_eq!(json["functions"][0]["blocks"][0]["term"], "ret %0");
//! ```

use serde_json::{Value as Json, json};

use crate::ir::{Block, Function, Module, Signature, Type};

pub fn module_to_json(module: &Module) -> Json {
    json!({
        "module": module.name,
        "declarations": module.declarations.iter().map(signature_to_json).collect::<Vec<_>>(),
        "functions": module.functions.iter().map(function_to_json).collect::<Vec<_>>(),
    })
}

fn signature_to_json(signature: &Signature) -> Json {
    json!({
        "name": signature.name,
        "params": signature.params,
    })
}

fn function_to_json(function: &Function) -> Json {
    let types: Vec<&str> = function
        .value_types
        .iter()
        .map(|ty| match ty {
            Type::F64 => "f64",
            Type::Bool => "bool",
        })
        .collect();

    json!({
        "name": function.signature.name,
        "params": function.signature.params,
        "slots": function.slots,
        "entry": function.entry.to_string(),
        "value_types": types,
        "blocks": function.blocks.iter().map(block_to_json).collect::<Vec<_>>(),
    })
}

fn block_to_json(block: &Block) -> Json {
    json!({
        "label": block.label,
        "insts": block.insts.iter().map(|inst| inst.to_string()).collect::<Vec<_>>(),
        "term": block.term.to_string(),
    })
}

/// Compact JSON for `module`.
pub fn to_json(module: &Module) -> String {
    module_to_json(module).to_string()
}

/// Pretty JSON for `module`, 2-space indented.
pub fn to_json_pretty(module: &Module) -> String {
    format!("{:#}", module_to_json(module))
}
