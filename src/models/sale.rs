use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// 客户名缺失时的占位符
pub const CUSTOMER_PLACEHOLDER: &str = "Cliente desconocido";

/// 金额整数部分最多 15 位
const MAX_INTEGER_DIGITS: i64 = 15;
/// 金额小数位 (scale) 的绝对值上限
const MAX_SCALE: i64 = 15;

/// 金额原始值的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountSource {
    Numeric,
    Missing,
    /// 非数字的原始值 (保留原文用于日志)
    Invalid(String),
}

/// 宽松金额: 缺失或非数字时按 0 处理, 不报错
#[derive(Debug, Clone, PartialEq)]
pub struct LenientAmount {
    pub value: BigDecimal,
    pub source: AmountSource,
}

impl LenientAmount {
    pub fn missing() -> Self {
        Self {
            value: BigDecimal::zero(),
            source: AmountSource::Missing,
        }
    }

    fn numeric(value: BigDecimal) -> Self {
        Self {
            value,
            source: AmountSource::Numeric,
        }
    }

    fn invalid(raw: String) -> Self {
        Self {
            value: BigDecimal::zero(),
            source: AmountSource::Invalid(raw),
        }
    }

    /// 数字 -> 原值; 字符串 -> 去空白后解析 (空串为 0); null -> 0; 其他 -> 0 并标记
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::missing(),
            Value::Number(n) => Self::parse(&n.to_string(), n.to_string()),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Self::numeric(BigDecimal::zero());
                }
                Self::parse(trimmed, s.clone())
            }
            other => Self::invalid(other.to_string()),
        }
    }

    // 超出金额范围的值 (如 "1e999999999") 也按非数字处理
    fn parse(text: &str, raw: String) -> Self {
        match BigDecimal::from_str(text) {
            Ok(v) if within_money_range(&v) => Self::numeric(v),
            _ => Self::invalid(raw),
        }
    }

    pub fn invalid_raw(&self) -> Option<&str> {
        match &self.source {
            AmountSource::Invalid(raw) => Some(raw),
            _ => None,
        }
    }
}

/// |v| < 10^15 且 scale 在 [-15, 15] 内
fn within_money_range(value: &BigDecimal) -> bool {
    let (digits, scale) = value.as_bigint_and_exponent();
    if !(-MAX_SCALE..=MAX_SCALE).contains(&scale) {
        return false;
    }
    if digits.is_zero() {
        return true;
    }
    let digit_count = digits.magnitude().to_string().len() as i64;
    digit_count - scale <= MAX_INTEGER_DIGITS
}

impl Default for LenientAmount {
    fn default() -> Self {
        Self::missing()
    }
}

impl<'de> Deserialize<'de> for LenientAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// 客户信息 (clientes)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    #[serde(default, rename = "nombre", deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

// 文本字段: 字符串原样, 数字/布尔转为文本, 其他视为缺失
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

// 只接受字符串 (图片地址)
fn string_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// 非对象的 clientes 视为缺失
fn lenient_customer<'de, D>(deserializer: D) -> Result<Option<Customer>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// 销售记录 - 外部传入, 用于生成通知消息
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleRecord {
    #[serde(default, rename = "clientes", deserialize_with = "lenient_customer")]
    pub customer: Option<Customer>,
    #[serde(default, rename = "nombre_producto", deserialize_with = "lenient_text")]
    pub product_name: Option<String>,
    #[serde(default, rename = "precio_publico")]
    pub public_price: LenientAmount,
    #[serde(default, rename = "anticipo")]
    pub deposit: LenientAmount,
    #[serde(default, rename = "estado", deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, rename = "imagen_url", deserialize_with = "string_only")]
    pub image_url: Option<String>,
}

impl SaleRecord {
    pub fn customer_name(&self) -> &str {
        self.customer
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(CUSTOMER_PLACEHOLDER)
    }

    pub fn product_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }

    /// 余额 = 公开价 - 订金 (可为负, 不截断)
    pub fn balance(&self) -> BigDecimal {
        &self.public_price.value - &self.deposit.value
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// 原始值非数字而被按 0 处理的金额字段
    pub fn invalid_amounts(&self) -> Vec<(&'static str, &str)> {
        [
            ("precio_publico", &self.public_price),
            ("anticipo", &self.deposit),
        ]
        .into_iter()
        .filter_map(|(field, amount)| amount.invalid_raw().map(|raw| (field, raw)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SaleRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn amounts_accept_numbers_and_numeric_strings() {
        let r = record(json!({ "precio_publico": 100.5, "anticipo": " 40 " }));
        assert_eq!(r.public_price.value, BigDecimal::from_str("100.5").unwrap());
        assert_eq!(r.deposit.value, BigDecimal::from(40));
        assert_eq!(r.public_price.source, AmountSource::Numeric);
        assert!(r.invalid_amounts().is_empty());
    }

    #[test]
    fn missing_and_null_amounts_are_zero() {
        let r = record(json!({ "anticipo": null }));
        assert_eq!(r.public_price, LenientAmount::missing());
        assert_eq!(r.deposit, LenientAmount::missing());
        assert_eq!(r.balance(), BigDecimal::zero());
    }

    #[test]
    fn non_numeric_amounts_are_zero_and_flagged() {
        let r = record(json!({ "precio_publico": "abc", "anticipo": true }));
        assert!(r.public_price.value.is_zero());
        assert!(r.deposit.value.is_zero());
        assert_eq!(
            r.invalid_amounts(),
            vec![("precio_publico", "abc"), ("anticipo", "true")]
        );
    }

    #[test]
    fn out_of_range_amounts_are_zero_and_flagged() {
        let cases = [
            "1e999999999",
            "1e-999999999",
            "Infinity",
            "NaN",
            "1e15",
            "0.0000000000000001",
        ];
        for raw in cases {
            let r = record(json!({ "precio_publico": raw }));
            assert!(r.public_price.value.is_zero(), "raw: {raw}");
            assert_eq!(r.invalid_amounts(), vec![("precio_publico", raw)]);
        }

        let r = record(json!({ "precio_publico": 1e300 }));
        assert!(r.public_price.value.is_zero());
        assert_eq!(r.invalid_amounts().len(), 1);
    }

    #[test]
    fn large_amounts_within_range_are_kept() {
        let r = record(json!({ "precio_publico": "999999999999999.99", "anticipo": "-1e3" }));
        assert_eq!(
            r.public_price.value,
            BigDecimal::from_str("999999999999999.99").unwrap()
        );
        assert_eq!(r.deposit.value, BigDecimal::from(-1000));
        assert!(r.invalid_amounts().is_empty());
    }

    #[test]
    fn text_fields_accept_numbers_and_bools() {
        let r = record(json!({
            "clientes": { "nombre": 42 },
            "nombre_producto": 123,
            "estado": true
        }));
        assert_eq!(r.customer_name(), "42");
        assert_eq!(r.product_name(), "123");
        assert_eq!(r.status(), "true");

        let r = record(json!({ "nombre_producto": ["a"], "estado": { "x": 1 } }));
        assert_eq!(r.product_name(), "");
        assert_eq!(r.status(), "");
    }

    #[test]
    fn non_object_customer_uses_placeholder() {
        for clientes in [json!("Ana"), json!(7), json!([{ "nombre": "Ana" }])] {
            let r = record(json!({ "clientes": clientes }));
            assert_eq!(r.customer_name(), CUSTOMER_PLACEHOLDER);
        }
    }

    #[test]
    fn non_string_image_url_is_absent() {
        assert_eq!(record(json!({ "imagen_url": 5 })).image_url(), None);
    }

    #[test]
    fn balance_is_signed() {
        let r = record(json!({ "precio_publico": "20", "anticipo": 40 }));
        assert_eq!(r.balance(), BigDecimal::from(-20));
    }

    #[test]
    fn customer_name_falls_back_to_placeholder() {
        assert_eq!(record(json!({})).customer_name(), CUSTOMER_PLACEHOLDER);
        assert_eq!(
            record(json!({ "clientes": null })).customer_name(),
            CUSTOMER_PLACEHOLDER
        );
        assert_eq!(
            record(json!({ "clientes": { "nombre": "" } })).customer_name(),
            CUSTOMER_PLACEHOLDER
        );
        assert_eq!(
            record(json!({ "clientes": { "nombre": "Ana" } })).customer_name(),
            "Ana"
        );
    }

    #[test]
    fn blank_image_url_is_absent() {
        assert_eq!(record(json!({ "imagen_url": "" })).image_url(), None);
        assert_eq!(
            record(json!({ "imagen_url": "https://cdn.example/a.jpg" })).image_url(),
            Some("https://cdn.example/a.jpg")
        );
    }
}
