use crate::client::ChatId;
use crate::models::SaleRecord;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// 请求体: 收件人手机号 + 销售记录列表
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default, deserialize_with = "phone_number")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "sale_rows")]
    pub rows: Option<Vec<SaleRecord>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Número de teléfono y filas son necesarios")]
    MissingFields,
}

impl SendRequest {
    /// 校验手机号非空且记录列表非空
    pub fn validate(self) -> Result<(ChatId, Vec<SaleRecord>), ValidationError> {
        let phone = self
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingFields)?;

        match self.rows {
            Some(rows) if !rows.is_empty() => Ok((ChatId::from_phone(phone), rows)),
            _ => Err(ValidationError::MissingFields),
        }
    }
}

// 手机号可能以数字形式传入
fn phone_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// 非数组视为缺失; 数组中非对象的元素按空记录处理
fn sale_rows<'de, D>(deserializer: D) -> Result<Option<Vec<SaleRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}
