//! Formatting and type-conversion helpers for generated code.

use super::types::{TypedExpr, ValueType};

/// Format a float for shader source, removing trailing zeros.
pub fn fmt_f32(v: f32) -> String {
    if v.is_finite() {
        let s = format!("{v:.9}");
        let s = s.trim_end_matches('0').trim_end_matches('.');
        if s == "-0" { "0".to_string() } else { s.to_string() }
    } else {
        "0".to_string()
    }
}

/// Sanitize a string to be a valid shader identifier fragment.
///
/// Unlike variable names, slot shader names drop invalid characters instead
/// of replacing them, so `"Vertex Position"` becomes `"VertexPosition"`.
pub fn sanitize_ident(s: &str) -> String {
    let out: String = s
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect();
    if out.is_empty() { "_".to_string() } else { out }
}

/// Constant literal of `ty` built from `values`; missing components are zero.
pub fn constant_literal(ty: ValueType, values: &[f32]) -> String {
    let len = ty.value_len();
    let parts: Vec<String> = (0..len)
        .map(|i| fmt_f32(values.get(i).copied().unwrap_or(0.0)))
        .collect();
    match ty {
        ValueType::Float => parts[0].clone(),
        _ => format!("{}({})", ty.hlsl(), parts.join(", ")),
    }
}

/// Convert an expression to `target`, or `None` when the types cannot be
/// converted (vector to matrix and back).
///
/// - scalar to vector splats with a swizzle: `(x.xxx)`
/// - wider vector to narrower truncates: `(v.xy)`
/// - narrower vector to wider pads with zeros: `$precision4(v, 0, 0)`
pub fn convert_expr(x: &TypedExpr, target: ValueType) -> Option<TypedExpr> {
    if x.ty == target {
        return Some(x.clone());
    }
    let from_n = x.ty.components()?;
    let to_n = target.components()?;

    let expr = if from_n == 1 {
        format!("({}.{})", x.expr, "x".repeat(to_n))
    } else if from_n > to_n {
        format!("({}.{})", x.expr, &"xyzw"[..to_n])
    } else {
        let pad = vec!["0"; to_n - from_n].join(", ");
        format!("{}({}, {})", target.hlsl(), x.expr, pad)
    };
    Some(TypedExpr::new(expr, target))
}

/// Whether an output of type `from` can feed an input of type `to`.
pub fn can_convert(from: ValueType, to: ValueType) -> bool {
    from == to || (from.components().is_some() && to.components().is_some())
}
