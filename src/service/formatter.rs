use crate::models::SaleRecord;
use bigdecimal::{BigDecimal, RoundingMode};

const SEPARATOR: &str = "------------------------";

/// 生成销售通知文本
pub fn format_sale_message(record: &SaleRecord) -> String {
    format!(
        "Cliente: {customer}\n\
         Producto: {product}\n\
         {SEPARATOR}\n\
         *Detalles de la Venta*\n\
         {SEPARATOR}\n\
         Precio: ${price}\n\
         Anticipo: ${deposit}\n\
         Saldo: ${balance}\n\
         Estado: {status}\n",
        customer = record.customer_name(),
        product = record.product_name(),
        price = format_currency(&record.public_price.value),
        deposit = format_currency(&record.deposit.value),
        balance = format_currency(&record.balance()),
        status = record.status(),
    )
}

/// 保留两位小数 (四舍五入)
pub fn format_currency(amount: &BigDecimal) -> String {
    let (digits, _) = amount
        .with_scale_round(2, RoundingMode::HalfUp)
        .as_bigint_and_exponent();
    let digits = digits.to_string();
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };
    let padded = format!("{magnitude:0>3}");
    let (whole, cents) = padded.split_at(padded.len() - 2);
    format!("{sign}{whole}.{cents}")
}
