//! Multipart re-encoding.
//!
//! The inbound form is split into fields and written into a fresh
//! `reqwest` form, which generates its own boundary.

use axum::{body::Bytes, extract::Multipart};
use reqwest::multipart::{Form, Part};

use crate::proxy::error::ProxyError;

/// One decoded form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    File {
        file_name: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// Drain every field out of an inbound multipart body.
pub async fn read_fields(mut multipart: Multipart) -> Result<Vec<FormField>, ProxyError> {
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let value = match file_name {
            None if content_type.is_none() => match String::from_utf8(data.to_vec()) {
                Ok(text) => FieldValue::Text(text),
                Err(_) => FieldValue::File { file_name: None, content_type: None, data },
            },
            file_name => FieldValue::File { file_name, content_type, data },
        };

        fields.push(FormField { name, value });
    }

    Ok(fields)
}

/// Rebuild an outbound form from decoded fields, in order.
pub fn to_form(fields: Vec<FormField>) -> Result<Form, ProxyError> {
    let mut form = Form::new();

    for field in fields {
        form = match field.value {
            FieldValue::Text(text) => form.text(field.name, text),
            FieldValue::File { file_name, content_type, data } => {
                let mut part = Part::bytes(data.to_vec());
                if let Some(file_name) = file_name {
                    part = part.file_name(file_name);
                }
                if let Some(content_type) = content_type {
                    part = part
                        .mime_str(&content_type)
                        .map_err(|e| ProxyError::BadRequest(format!("invalid part content type: {}", e)))?;
                }
                form.part(field.name, part)
            }
        };
    }

    Ok(form)
}
