use std::fmt;
use std::str::FromStr;

use super::crc::crc16_hex;
use super::tlv::{merchant_account_info, parse_fields, Field, FieldId, PIX_GUI};
use super::{PixError, DEFAULT_MERCHANT_CITY, DEFAULT_MERCHANT_NAME};

const PAYLOAD_FORMAT: &str = "01";
const CATEGORY_CODE: &str = "0000";
const CURRENCY_BRL: &str = "986";
const COUNTRY_CODE: &str = "BR";
const DEFAULT_REFERENCE_LABEL: &str = "***";
const CRC_HEADER: &str = "6304";

const MAX_NAME_LEN: usize = 25;
const MAX_CITY_LEN: usize = 15;
const MAX_AMOUNT_LEN: usize = 13;

/// Transaction amount in cents. Always rendered with two fraction digits
/// and a `.` separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    cents: u64,
}

impl Amount {
    pub fn from_cents(cents: u64) -> Result<Self, PixError> {
        if cents == 0 {
            return Err(PixError::InvalidAmount("amount must be positive".to_string()));
        }

        let amount = Self { cents };
        let len = amount.to_string().len();
        if len > MAX_AMOUNT_LEN {
            return Err(PixError::InvalidAmount(format!(
                "{} characters exceed the {} allowed",
                len, MAX_AMOUNT_LEN
            )));
        }

        Ok(amount)
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl TryFrom<f64> for Amount {
    type Error = PixError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PixError::InvalidAmount(format!("{} is not a number", value)));
        }
        if value <= 0.0 {
            return Err(PixError::InvalidAmount(format!("{} is not positive", value)));
        }

        let cents = (value * 100.0).round();
        if cents >= 1e15 {
            return Err(PixError::InvalidAmount(format!("{} is too large", value)));
        }

        Amount::from_cents(cents as u64)
    }
}

impl FromStr for Amount {
    type Err = PixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PixError::InvalidAmount("amount is missing".to_string()));
        }

        let value: f64 = s
            .parse()
            .map_err(|_| PixError::InvalidAmount(format!("{:?} is not numeric", s)))?;

        Amount::try_from(value)
    }
}

impl TryFrom<&str> for Amount {
    type Error = PixError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single static PIX charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrCode {
    pub key: String,
    pub amount: Amount,
    pub merchant_name: String,
    pub merchant_city: String,
    pub reference_label: String,
}

impl BrCode {
    pub fn new(key: impl Into<String>, amount: Amount) -> Self {
        Self {
            key: key.into(),
            amount,
            merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
            merchant_city: DEFAULT_MERCHANT_CITY.to_string(),
            reference_label: DEFAULT_REFERENCE_LABEL.to_string(),
        }
    }

    pub fn merchant(mut self, name: impl Into<String>, city: impl Into<String>) -> Self {
        self.merchant_name = name.into();
        self.merchant_city = city.into();
        self
    }

    pub fn reference_label(mut self, label: impl Into<String>) -> Self {
        self.reference_label = label.into();
        self
    }

    /// Top-level fields in the order scanners expect, CRC excluded.
    pub fn fields(&self) -> Result<Vec<Field>, PixError> {
        if self.key.is_empty() {
            return Err(PixError::EmptyKey);
        }

        let additional_data =
            Field::new(FieldId::ReferenceLabel, self.reference_label.as_str()).encode()?;

        Ok(vec![
            Field::new(FieldId::PayloadFormatIndicator, PAYLOAD_FORMAT),
            merchant_account_info(&self.key)?,
            Field::new(FieldId::MerchantCategoryCode, CATEGORY_CODE),
            Field::new(FieldId::TransactionCurrency, CURRENCY_BRL),
            Field::new(FieldId::TransactionAmount, self.amount.to_string()),
            Field::new(FieldId::CountryCode, COUNTRY_CODE),
            Field::new(
                FieldId::MerchantName,
                clamp_upper(&self.merchant_name, MAX_NAME_LEN),
            ),
            Field::new(
                FieldId::MerchantCity,
                clamp_upper(&self.merchant_city, MAX_CITY_LEN),
            ),
            Field::new(FieldId::AdditionalData, additional_data),
        ])
    }

    pub fn encode(&self) -> Result<String, PixError> {
        let mut payload = String::new();
        for field in self.fields()? {
            payload.push_str(&field.encode()?);
        }

        payload.push_str(CRC_HEADER);
        let crc = crc16_hex(&payload);
        payload.push_str(&crc);

        Ok(payload)
    }
}

/// Truncates to `limit` characters and upper-cases. Upper-casing can grow
/// multi-byte text, so the result is trimmed again until it fits in `limit`
/// bytes.
fn clamp_upper(value: &str, limit: usize) -> String {
    let mut clamped = value.chars().take(limit).collect::<String>().to_uppercase();
    while clamped.len() > limit {
        clamped.pop();
    }
    clamped
}

/// Builds a "Copia e Cola" payload with the default reference label.
pub fn generate_payload<A>(
    key: &str,
    amount: A,
    name: &str,
    city: &str,
) -> Result<String, PixError>
where
    A: TryInto<Amount, Error = PixError>,
{
    BrCode::new(key, amount.try_into()?)
        .merchant(name, city)
        .encode()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub key: String,
    pub amount: Option<Amount>,
    pub merchant_name: String,
    pub merchant_city: String,
    pub reference_label: Option<String>,
}

/// Verifies the CRC trailer and recovers the charge data.
pub fn decode_payload(payload: &str) -> Result<DecodedPayload, PixError> {
    let split = payload
        .len()
        .checked_sub(4)
        .filter(|at| payload.is_char_boundary(*at))
        .ok_or_else(|| PixError::Malformed("payload too short".to_string()))?;
    let (body, found) = payload.split_at(split);

    if !body.ends_with(CRC_HEADER) {
        return Err(PixError::Malformed("missing CRC trailer".to_string()));
    }

    let expected = crc16_hex(body);
    if !found.eq_ignore_ascii_case(&expected) {
        return Err(PixError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }

    let fields = parse_fields(payload)?;
    let starts_with_format = fields.first().is_some_and(|(id, value)| {
        *id == FieldId::PayloadFormatIndicator.code() && *value == PAYLOAD_FORMAT
    });
    if !starts_with_format {
        return Err(PixError::Malformed(
            "payload does not start with the format indicator".to_string(),
        ));
    }

    let mut key = None;
    let mut amount = None;
    let mut merchant_name = None;
    let mut merchant_city = None;
    let mut reference_label = None;

    for (id, value) in fields {
        match id {
            id if id == FieldId::MerchantAccountInfo.code() => {
                let sub = parse_fields(value)?;
                let gui_ok = sub.iter().any(|(sub_id, sub_value)| {
                    *sub_id == FieldId::Gui.code() && sub_value.eq_ignore_ascii_case(PIX_GUI)
                });
                if !gui_ok {
                    return Err(PixError::Malformed("merchant account is not PIX".to_string()));
                }
                key = sub
                    .iter()
                    .find(|(sub_id, _)| *sub_id == FieldId::PixKey.code())
                    .map(|(_, sub_value)| sub_value.to_string());
            }
            id if id == FieldId::TransactionAmount.code() => {
                amount = Some(value.parse::<Amount>()?)
            }
            id if id == FieldId::MerchantName.code() => merchant_name = Some(value.to_string()),
            id if id == FieldId::MerchantCity.code() => merchant_city = Some(value.to_string()),
            id if id == FieldId::AdditionalData.code() => {
                reference_label = parse_fields(value)?
                    .into_iter()
                    .find(|(sub_id, _)| *sub_id == FieldId::ReferenceLabel.code())
                    .map(|(_, sub_value)| sub_value.to_string());
            }
            _ => {}
        }
    }

    Ok(DecodedPayload {
        key: key.ok_or_else(|| PixError::Malformed("missing PIX key".to_string()))?,
        amount,
        merchant_name: merchant_name
            .ok_or_else(|| PixError::Malformed("missing merchant name".to_string()))?,
        merchant_city: merchant_city
            .ok_or_else(|| PixError::Malformed("missing merchant city".to_string()))?,
        reference_label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "57130513000134";

    fn field_value(payload: &str, id: &str) -> String {
        parse_fields(payload)
            .unwrap()
            .into_iter()
            .find(|(field_id, _)| *field_id == id)
            .map(|(_, value)| value.to_string())
            .unwrap()
    }

    #[test]
    fn known_payload() {
        let payload = generate_payload(KEY, "5.50", "DOLLYNSTORM", "BRASILIA").unwrap();
        assert_eq!(
            payload,
            "00020126360014BR.GOV.BCB.PIX01145713051300013452040000530398654045.505802BR5911DOLLYNSTORM6008BRASILIA62070503***63042FBB"
        );
    }

    #[test]
    fn known_payload_shape() {
        let payload = generate_payload(KEY, "5.50", "DOLLYNSTORM", "BRASILIA").unwrap();

        assert!(payload.starts_with("000201"));
        assert!(payload.contains("2636"));
        assert!(payload.contains("0014BR.GOV.BCB.PIX0114"));
        assert!(payload.contains("54045.50"));

        let (body, crc) = payload.split_at(payload.len() - 4);
        assert!(body.ends_with("6304"));
        assert!(crc.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(crc16_hex(body), crc);
    }

    #[test]
    fn deterministic() {
        let first = generate_payload(KEY, 12.34, "Loja", "Recife").unwrap();
        for _ in 0..10 {
            assert_eq!(generate_payload(KEY, 12.34, "Loja", "Recife").unwrap(), first);
        }
    }

    #[test]
    fn amount_has_two_fraction_digits() {
        let default = |amount: &str| {
            generate_payload(KEY, amount, DEFAULT_MERCHANT_NAME, DEFAULT_MERCHANT_CITY).unwrap()
        };
        assert_eq!(field_value(&default("5"), "54"), "5.00");
        assert_eq!(field_value(&default("19.999"), "54"), "20.00");

        let payload =
            generate_payload(KEY, 0.5, DEFAULT_MERCHANT_NAME, DEFAULT_MERCHANT_CITY).unwrap();
        assert_eq!(field_value(&payload, "54"), "0.50");
    }

    #[test]
    fn name_and_city_are_truncated_and_upper_cased() {
        let payload = generate_payload(KEY, 1.0, &"a".repeat(30), &"b".repeat(20)).unwrap();
        assert_eq!(field_value(&payload, "59"), "A".repeat(25));
        assert_eq!(field_value(&payload, "60"), "B".repeat(15));
    }

    #[test]
    fn multi_byte_city_still_fits() {
        let code =
            BrCode::new(KEY, Amount::from_cents(100).unwrap()).merchant("Loja", "ßßßßßßßßßß");
        let fields = code.fields().unwrap();
        let city = fields.iter().find(|f| f.id == FieldId::MerchantCity).unwrap();
        assert!(city.value.len() <= MAX_CITY_LEN);
        assert!(decode_payload(&code.encode().unwrap()).is_ok());
    }

    #[test]
    fn declared_lengths_match_values() {
        let code = BrCode::new("pix@example.com", Amount::from_cents(1000).unwrap())
            .merchant("Loja Teste", "Sao Paulo");
        for field in code.fields().unwrap() {
            let encoded = field.encode().unwrap();
            let declared: usize = encoded[2..4].parse().unwrap();
            assert_eq!(declared, field.value.len());
            assert_eq!(&encoded[..2], field.id.code());
        }
    }

    #[test]
    fn fields_keep_canonical_order() {
        let payload = generate_payload(KEY, 2.5, "Loja", "Natal").unwrap();
        let ids: Vec<&str> = parse_fields(&payload)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["00", "26", "52", "53", "54", "58", "59", "60", "62", "63"]);
    }

    #[test]
    fn round_trip() {
        let payload = generate_payload("pix@example.com", "10", "Loja Teste", "Sao Paulo").unwrap();
        assert!(payload.ends_with("63043D31"));

        let decoded = decode_payload(&payload).unwrap();
        assert_eq!(decoded.key, "pix@example.com");
        assert_eq!(decoded.amount, Some(Amount::from_cents(1000).unwrap()));
        assert_eq!(decoded.merchant_name, "LOJA TESTE");
        assert_eq!(decoded.merchant_city, "SAO PAULO");
        assert_eq!(decoded.reference_label.as_deref(), Some("***"));
    }

    #[test]
    fn custom_reference_label() {
        let payload = BrCode::new(KEY, Amount::from_cents(250).unwrap())
            .reference_label("RIFA42")
            .encode()
            .unwrap();
        assert!(payload.contains("62100506RIFA42"));
        assert_eq!(decode_payload(&payload).unwrap().reference_label.as_deref(), Some("RIFA42"));
    }

    #[test]
    fn rejects_bad_amounts() {
        for amount in ["", "abc", "NaN", "inf", "0", "-1", "0.001"] {
            assert!(
                matches!(Amount::from_str(amount), Err(PixError::InvalidAmount(_))),
                "{:?} should be rejected",
                amount
            );
        }
        assert!(matches!(Amount::try_from(f64::NAN), Err(PixError::InvalidAmount(_))));
        assert!(matches!(Amount::try_from(1e12), Err(PixError::InvalidAmount(_))));
        assert!(matches!(
            generate_payload(KEY, "abc", "Loja", "Natal"),
            Err(PixError::InvalidAmount(_))
        ));
    }

    #[test]
    fn largest_amount_fits_thirteen_characters() {
        let amount = Amount::from_cents(999_999_999_999).unwrap();
        assert_eq!(amount.to_string(), "9999999999.99");
        assert!(Amount::from_cents(1_000_000_000_000).is_err());
    }

    #[test]
    fn rejects_bad_keys() {
        assert_eq!(generate_payload("", 1.0, "Loja", "Natal"), Err(PixError::EmptyKey));
        assert!(matches!(
            generate_payload(&"k".repeat(100), 1.0, "Loja", "Natal"),
            Err(PixError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn decode_detects_tampering() {
        let payload = generate_payload(KEY, "5.50", "DOLLYNSTORM", "BRASILIA").unwrap();
        let tampered = payload.replace("5.50", "9.50");
        assert!(matches!(
            decode_payload(&tampered),
            Err(PixError::ChecksumMismatch { .. })
        ));

        assert!(matches!(decode_payload("0002"), Err(PixError::Malformed(_))));
        assert!(matches!(decode_payload("abc"), Err(PixError::Malformed(_))));
    }
    fn signed(fields: &[(&str, String)]) -> String {
        let mut body: String = fields
            .iter()
            .map(|(id, value)| crate::pix::format_field(id, value).unwrap())
            .collect();
        body.push_str(CRC_HEADER);
        let crc = crc16_hex(&body);
        body + &crc
    }

    #[test]
    fn decode_checks_format_indicator_and_gui() {
        let account = |gui: &str| {
            crate::pix::format_field("00", gui).unwrap()
                + &crate::pix::format_field("01", KEY).unwrap()
        };

        let decoded = decode_payload(&signed(&[
            ("00", "01".to_string()),
            ("26", account("br.gov.bcb.pix")),
            ("59", "LOJA".to_string()),
            ("60", "NATAL".to_string()),
        ]))
        .unwrap();
        assert_eq!(decoded.key, KEY);
        assert_eq!(decoded.amount, None);
        assert_eq!(decoded.reference_label, None);

        let foreign = signed(&[
            ("00", "01".to_string()),
            ("26", account("COM.EXAMPLE")),
            ("59", "LOJA".to_string()),
            ("60", "NATAL".to_string()),
        ]);
        assert!(matches!(decode_payload(&foreign), Err(PixError::Malformed(_))));

        let wrong_format = signed(&[
            ("00", "02".to_string()),
            ("26", account("BR.GOV.BCB.PIX")),
            ("59", "LOJA".to_string()),
            ("60", "NATAL".to_string()),
        ]);
        assert!(matches!(decode_payload(&wrong_format), Err(PixError::Malformed(_))));
    }
}
