//! Representación textual del manifiesto (formato RTM) para logs y revisión.

use crate::instruction::{Instruction, Manifest};
use crate::value::{Expression, ManifestValue, ToManifestValue};

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn join(values: &[ManifestValue]) -> String {
    values.iter().map(render_value).collect::<Vec<_>>().join(", ")
}

pub fn render_value(value: &ManifestValue) -> String {
    match value {
        ManifestValue::Bool(b) => b.to_string(),
        ManifestValue::I32(v) => format!("{v}i32"),
        ManifestValue::I64(v) => format!("{v}i64"),
        ManifestValue::U8(v) => format!("{v}u8"),
        ManifestValue::U16(v) => format!("{v}u16"),
        ManifestValue::U32(v) => format!("{v}u32"),
        ManifestValue::U64(v) => format!("{v}u64"),
        ManifestValue::U128(v) => format!("{v}u128"),
        ManifestValue::String(s) => quote(s),
        ManifestValue::Decimal(d) => format!("Decimal(\"{d}\")"),
        ManifestValue::Address(a) => format!("Address(\"{a}\")"),
        ManifestValue::Bucket(b) => format!("Bucket({})", quote(b)),
        ManifestValue::Expression(Expression::EntireWorktop) => "Expression(\"ENTIRE_WORKTOP\")".to_string(),
        ManifestValue::Expression(Expression::EntireAuthZone) => "Expression(\"ENTIRE_AUTH_ZONE\")".to_string(),
        ManifestValue::Blob(b) => format!("Blob(\"{}\")", b.to_hex()),
        ManifestValue::Enum { discriminator, fields } => format!("Enum<{discriminator}u8>({})", join(fields)),
        ManifestValue::Array { element_kind, elements } => format!("Array<{}>({})", element_kind.type_name(), join(elements)),
        ManifestValue::Tuple(fields) => format!("Tuple({})", join(fields)),
        ManifestValue::Map { key_kind,
                             value_kind,
                             entries, } => {
            let body = entries.iter()
                              .map(|(k, v)| format!("{} => {}", render_value(k), render_value(v)))
                              .collect::<Vec<_>>()
                              .join(", ");
            format!("Map<{}, {}>({body})", key_kind.type_name(), value_kind.type_name())
        }
    }
}

fn statement(head: &str, operands: &[ManifestValue]) -> String {
    if operands.is_empty() {
        format!("{head};")
    } else {
        format!("{head} {};", operands.iter().map(render_value).collect::<Vec<_>>().join(" "))
    }
}

fn account_call(account: &crate::value::Address, method: &str, rest: Vec<ManifestValue>) -> String {
    let mut operands = vec![ManifestValue::Address(account.clone()), ManifestValue::string(method)];
    operands.extend(rest);
    statement("CALL_METHOD", &operands)
}

pub fn render_instruction(instruction: &Instruction) -> String {
    use ManifestValue as V;
    match instruction {
        Instruction::LockFee { account, amount } => account_call(account, "lock_fee", vec![V::Decimal(*amount)]),
        Instruction::CreateProofOfAmount { account, resource, amount } => {
            account_call(account, "create_proof_of_amount", vec![V::Address(resource.clone()), V::Decimal(*amount)])
        }
        Instruction::Withdraw { account, resource, amount } => {
            account_call(account, "withdraw", vec![V::Address(resource.clone()), V::Decimal(*amount)])
        }
        Instruction::DepositAll { account } => account_call(account, "deposit_batch", vec![V::Expression(Expression::EntireWorktop)]),
        Instruction::CallMethod { address, method, args } => {
            let mut operands = vec![V::Address(address.clone()), V::string(method.clone())];
            operands.extend(args.iter().cloned());
            statement("CALL_METHOD", &operands)
        }
        Instruction::CallFunction { package,
                                    blueprint,
                                    function,
                                    args, } => {
            let mut operands = vec![V::Address(package.clone()), V::string(blueprint.clone()), V::string(function.clone())];
            operands.extend(args.iter().cloned());
            statement("CALL_FUNCTION", &operands)
        }
        Instruction::CreateFungibleResource(def) => {
            let mut operands = vec![def.owner_role.to_value(), V::Bool(def.track_total_supply), V::U8(def.divisibility)];
            let head = match def.initial_supply {
                Some(supply) => {
                    operands.push(V::Decimal(supply));
                    "CREATE_FUNGIBLE_RESOURCE_WITH_INITIAL_SUPPLY"
                }
                None => "CREATE_FUNGIBLE_RESOURCE",
            };
            operands.extend([def.roles.to_value(), def.metadata.to_value(), V::option(None)]);
            statement(head, &operands)
        }
        Instruction::TakeFromWorktop { .. }
        | Instruction::CreateNonFungibleResource(_)
        | Instruction::SetMetadata { .. }
        | Instruction::PublishPackage { .. } => statement(instruction.name(), &instruction.operands()),
    }
}

pub fn render_manifest(manifest: &Manifest) -> String {
    manifest.instructions.iter().map(render_instruction).collect::<Vec<_>>().join("\n")
}
