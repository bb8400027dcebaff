use super::PixError;

const MAX_VALUE_LEN: usize = 99;
pub(super) const PIX_GUI: &str = "BR.GOV.BCB.PIX";

/// Tags used by the BR Code profile. Sub-field tags share codes with
/// top-level tags, the enclosing field disambiguates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    PayloadFormatIndicator,
    MerchantAccountInfo,
    MerchantCategoryCode,
    TransactionCurrency,
    TransactionAmount,
    CountryCode,
    MerchantName,
    MerchantCity,
    AdditionalData,
    Crc,
    // inside 26
    Gui,
    PixKey,
    // inside 62
    ReferenceLabel,
}

impl FieldId {
    pub fn code(&self) -> &'static str {
        match self {
            FieldId::PayloadFormatIndicator => "00",
            FieldId::MerchantAccountInfo => "26",
            FieldId::MerchantCategoryCode => "52",
            FieldId::TransactionCurrency => "53",
            FieldId::TransactionAmount => "54",
            FieldId::CountryCode => "58",
            FieldId::MerchantName => "59",
            FieldId::MerchantCity => "60",
            FieldId::AdditionalData => "62",
            FieldId::Crc => "63",
            FieldId::Gui => "00",
            FieldId::PixKey => "01",
            FieldId::ReferenceLabel => "05",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: FieldId,
    pub value: String,
}

impl Field {
    pub fn new(id: FieldId, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn encode(&self) -> Result<String, PixError> {
        let encoded = format_field(self.id.code(), &self.value)?;

        let declared: usize = encoded[2..4].parse().map_err(|_| {
            PixError::EncodingInvariantViolation(format!(
                "field {} has a non-numeric length",
                self.id.code()
            ))
        })?;
        if declared != encoded.len() - 4 {
            return Err(PixError::EncodingInvariantViolation(format!(
                "field {} declares {} but carries {}",
                self.id.code(),
                declared,
                encoded.len() - 4
            )));
        }

        Ok(encoded)
    }
}

/// `id ++ zero padded length ++ value`. Lengths are counted in bytes.
pub fn format_field(id: &str, value: &str) -> Result<String, PixError> {
    if id.len() != 2 || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PixError::EncodingInvariantViolation(format!(
            "field id {:?} is not two digits",
            id
        )));
    }

    if value.len() > MAX_VALUE_LEN {
        return Err(PixError::FieldTooLong {
            id: id.to_string(),
            len: value.len(),
        });
    }

    Ok(format!("{}{:02}{}", id, value.len(), value))
}

/// Field 26: GUI sub-field followed by the receiver key. The key shape
/// (CPF, CNPJ, e-mail, phone, random) is not checked here.
pub fn merchant_account_info(pix_key: &str) -> Result<Field, PixError> {
    let gui = Field::new(FieldId::Gui, PIX_GUI).encode()?;
    let key = Field::new(FieldId::PixKey, pix_key).encode()?;

    let info = Field::new(FieldId::MerchantAccountInfo, format!("{}{}", gui, key));
    if info.value.len() > MAX_VALUE_LEN {
        return Err(PixError::FieldTooLong {
            id: FieldId::MerchantAccountInfo.code().to_string(),
            len: info.value.len(),
        });
    }

    Ok(info)
}

/// Splits a TLV string into `(id, value)` pairs without descending into
/// composite fields.
pub fn parse_fields(input: &str) -> Result<Vec<(&str, &str)>, PixError> {
    let mut fields = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let id = rest
            .get(0..2)
            .ok_or_else(|| PixError::Malformed("truncated field id".to_string()))?;
        let len: usize = rest
            .get(2..4)
            .filter(|l| l.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|l| l.parse().ok())
            .ok_or_else(|| PixError::Malformed(format!("bad length for field {}", id)))?;
        let value = rest.get(4..4 + len).ok_or_else(|| {
            PixError::Malformed(format!("field {} runs past the end of input", id))
        })?;

        fields.push((id, value));
        rest = &rest[4 + len..];
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padded_length() {
        assert_eq!(format_field("00", "01").unwrap(), "000201");
        assert_eq!(format_field("54", "5.50").unwrap(), "54045.50");
        assert_eq!(format_field("62", "").unwrap(), "6200");
    }

    #[test]
    fn accepts_99_and_rejects_100() {
        let value = "x".repeat(99);
        assert_eq!(format_field("59", &value).unwrap().len(), 103);

        let value = "x".repeat(100);
        assert_eq!(
            format_field("59", &value),
            Err(PixError::FieldTooLong {
                id: "59".to_string(),
                len: 100
            })
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(matches!(
            format_field("5", "x"),
            Err(PixError::EncodingInvariantViolation(_))
        ));
        assert!(matches!(
            format_field("A1", "x"),
            Err(PixError::EncodingInvariantViolation(_))
        ));
    }

    #[test]
    fn merchant_account_info_nests_gui_and_key() {
        let info = merchant_account_info("57130513000134").unwrap();
        assert_eq!(info.id, FieldId::MerchantAccountInfo);
        assert_eq!(info.value, "0014BR.GOV.BCB.PIX011457130513000134");
        assert_eq!(
            info.encode().unwrap(),
            "26360014BR.GOV.BCB.PIX011457130513000134"
        );
    }

    #[test]
    fn merchant_account_info_rejects_oversized_key() {
        // 18 bytes of GUI plus 4 bytes of key header leave 77 for the key
        assert!(merchant_account_info(&"k".repeat(77)).is_ok());
        assert!(matches!(
            merchant_account_info(&"k".repeat(78)),
            Err(PixError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn parses_flat_sequence() {
        let fields = parse_fields("000201540410.005802BR").unwrap();
        assert_eq!(fields, vec![("00", "01"), ("54", "10.00"), ("58", "BR")]);
    }

    #[test]
    fn parse_rejects_truncated_input() {
        assert!(matches!(
            parse_fields("0002"),
            Err(PixError::Malformed(_))
        ));
        assert!(matches!(parse_fields("00x1a"), Err(PixError::Malformed(_))));
        assert!(matches!(parse_fields("0"), Err(PixError::Malformed(_))));
    }
}
