//! CLIXML serialization: the write side of the PSRP object model.
//!
//! This is a straightforward recursive string builder rather than the
//! full reference-tracking serializer PowerShell itself uses: every nested
//! object gets a fresh `RefId` and no `<Ref>`/`<TNRef>` back-references are
//! ever emitted. That is a strict subset of the wire format PowerShell can
//! parse, so round-tripping through a real PowerShell host still works; it
//! just never reconstructs aliasing between two branches of the same object
//! graph.

use std::fmt::Write as _;

use super::{ComplexObject, ComplexObjectContent, Container, PsEnums, PsPrimitiveValue, PsValue};

pub fn to_clixml_string(value: &PsValue) -> Result<String, crate::PowerShellRemotingError> {
    let mut out = String::new();
    let mut ref_id = 0u32;
    write_ps_value(&mut out, value, &mut ref_id);
    Ok(out)
}

fn next_ref(ref_id: &mut u32) -> u32 {
    let id = *ref_id;
    *ref_id += 1;
    id
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn write_ps_value(out: &mut String, value: &PsValue, ref_id: &mut u32) {
    match value {
        PsValue::Primitive(p) => write_primitive(out, p),
        PsValue::Object(obj) => write_complex_object(out, obj, ref_id),
    }
}

fn write_primitive(out: &mut String, p: &PsPrimitiveValue) {
    match p {
        PsPrimitiveValue::Str(s) => {
            let _ = write!(out, "<S>{}</S>", escape(s));
        }
        PsPrimitiveValue::Bool(b) => {
            let _ = write!(out, "<B>{b}</B>");
        }
        PsPrimitiveValue::I32(v) => {
            let _ = write!(out, "<I32>{v}</I32>");
        }
        PsPrimitiveValue::U32(v) => {
            let _ = write!(out, "<U32>{v}</U32>");
        }
        PsPrimitiveValue::I64(v) => {
            let _ = write!(out, "<I64>{v}</I64>");
        }
        PsPrimitiveValue::U64(v) => {
            let _ = write!(out, "<U64>{v}</U64>");
        }
        PsPrimitiveValue::Guid(g) => {
            let _ = write!(out, "<G>{g}</G>");
        }
        PsPrimitiveValue::Nil => {
            out.push_str("<Nil />");
        }
        PsPrimitiveValue::Bytes(b) => {
            let _ = write!(
                out,
                "<BA>{}</BA>",
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)
            );
        }
        PsPrimitiveValue::Version(v) => {
            let _ = write!(out, "<Version>{v}</Version>");
        }
        PsPrimitiveValue::DateTime(d) => {
            let _ = write!(out, "<DT>{d}</DT>");
        }
        PsPrimitiveValue::Char(c) => {
            let _ = write!(out, "<C>{}</C>", *c as u32);
        }
    }
}

fn write_complex_object(out: &mut String, obj: &ComplexObject, ref_id: &mut u32) {
    let id = next_ref(ref_id);
    let _ = write!(out, "<Obj RefId=\"{id}\">");

    if let Some(type_def) = &obj.type_def
        && !type_def.type_names.is_empty()
    {
        let tn_id = next_ref(ref_id);
        let _ = write!(out, "<TN RefId=\"{tn_id}\">");
        for name in &type_def.type_names {
            let _ = write!(out, "<T>{}</T>", escape(name));
        }
        out.push_str("</TN>");
    }

    if let Some(to_string) = &obj.to_string {
        let _ = write!(out, "<ToString>{}</ToString>", escape(to_string));
    }

    match &obj.content {
        ComplexObjectContent::Standard => {}
        ComplexObjectContent::ExtendedPrimitive(p) => write_primitive(out, p),
        ComplexObjectContent::Container(c) => write_container(out, c, ref_id),
        ComplexObjectContent::PsEnums(e) => write_enum(out, e),
    }

    if !obj.adapted_properties.is_empty() {
        out.push_str("<Props>");
        for prop in obj.adapted_properties.values() {
            write_named_value(out, &prop.name, &prop.value, ref_id);
        }
        out.push_str("</Props>");
    }

    if !obj.extended_properties.is_empty() {
        out.push_str("<MS>");
        for prop in obj.extended_properties.values() {
            write_named_value(out, &prop.name, &prop.value, ref_id);
        }
        out.push_str("</MS>");
    }

    out.push_str("</Obj>");
}

fn write_enum(out: &mut String, e: &PsEnums) {
    let _ = write!(out, "<I32>{}</I32>", e.value);
}

fn write_container(out: &mut String, container: &Container, ref_id: &mut u32) {
    match container {
        Container::Stack(items) => write_list(out, "STK", items, ref_id),
        Container::Queue(items) => write_list(out, "QUE", items, ref_id),
        Container::List(items) => write_list(out, "LST", items, ref_id),
        Container::Dictionary(map) => {
            out.push_str("<DCT>");
            for (k, v) in map {
                out.push_str("<En>");
                out.push_str("<S N=\"Key\">");
                write_ps_value_inner(out, k, ref_id);
                out.push_str("</S>");
                write_named_value(out, "Value", v, ref_id);
                out.push_str("</En>");
            }
            out.push_str("</DCT>");
        }
    }
}

fn write_ps_value_inner(out: &mut String, value: &PsValue, ref_id: &mut u32) {
    // Dictionary keys are written with an enclosing named tag by the caller;
    // here we only need the raw encoded value.
    write_ps_value(out, value, ref_id);
}

fn write_list(out: &mut String, tag: &str, items: &[PsValue], ref_id: &mut u32) {
    let _ = write!(out, "<{tag}>");
    for item in items {
        write_ps_value(out, item, ref_id);
    }
    let _ = write!(out, "</{tag}>");
}

/// Write a value tagged with a `N="name"` attribute, the shape used inside
/// `<Props>`/`<MS>` and dictionary entries.
fn write_named_value(out: &mut String, name: &str, value: &PsValue, ref_id: &mut u32) {
    match value {
        PsValue::Primitive(p) => write_named_primitive(out, name, p),
        PsValue::Object(obj) => {
            // Serialize the object, then splice the N attribute into its
            // opening <Obj ...> tag.
            let mut inner = String::new();
            write_complex_object(&mut inner, obj, ref_id);
            if let Some(rest) = inner.strip_prefix("<Obj ") {
                let _ = write!(out, "<Obj N=\"{}\" {rest}", escape(name));
            } else {
                out.push_str(&inner);
            }
        }
    }
}

fn write_named_primitive(out: &mut String, name: &str, p: &PsPrimitiveValue) {
    let escaped_name = escape(name);
    match p {
        PsPrimitiveValue::Str(s) => {
            let _ = write!(out, "<S N=\"{escaped_name}\">{}</S>", escape(s));
        }
        PsPrimitiveValue::Bool(b) => {
            let _ = write!(out, "<B N=\"{escaped_name}\">{b}</B>");
        }
        PsPrimitiveValue::I32(v) => {
            let _ = write!(out, "<I32 N=\"{escaped_name}\">{v}</I32>");
        }
        PsPrimitiveValue::U32(v) => {
            let _ = write!(out, "<U32 N=\"{escaped_name}\">{v}</U32>");
        }
        PsPrimitiveValue::I64(v) => {
            let _ = write!(out, "<I64 N=\"{escaped_name}\">{v}</I64>");
        }
        PsPrimitiveValue::U64(v) => {
            let _ = write!(out, "<U64 N=\"{escaped_name}\">{v}</U64>");
        }
        PsPrimitiveValue::Guid(g) => {
            let _ = write!(out, "<G N=\"{escaped_name}\">{g}</G>");
        }
        PsPrimitiveValue::Nil => {
            let _ = write!(out, "<Nil N=\"{escaped_name}\" />");
        }
        PsPrimitiveValue::Bytes(b) => {
            let _ = write!(
                out,
                "<BA N=\"{escaped_name}\">{}</BA>",
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)
            );
        }
        PsPrimitiveValue::Version(v) => {
            let _ = write!(out, "<Version N=\"{escaped_name}\">{v}</Version>");
        }
        PsPrimitiveValue::DateTime(d) => {
            let _ = write!(out, "<DT N=\"{escaped_name}\">{d}</DT>");
        }
        PsPrimitiveValue::Char(c) => {
            let _ = write!(out, "<C N=\"{escaped_name}\">{}</C>", *c as u32);
        }
    }
}
