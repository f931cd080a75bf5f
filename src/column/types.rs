#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    /// Auto-incrementing integer; only meaningful on a primary key.
    Serial,
    BigSerial,
    Integer,
    BigInt,
    SmallInt,
    Text,
    VarChar(usize),
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    JsonB,
    Real,
    DoublePrecision,
    Decimal { precision: u8, scale: u8 },
}

impl ColumnType {
    pub fn is_serial(&self) -> bool {
        matches!(self, ColumnType::Serial | ColumnType::BigSerial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_types() {
        assert!(ColumnType::Serial.is_serial());
        assert!(ColumnType::BigSerial.is_serial());
        assert!(!ColumnType::Integer.is_serial());
    }

    #[test]
    fn decimal_keeps_precision_and_scale() {
        let calories = ColumnType::Decimal {
            precision: 8,
            scale: 2,
        };
        assert_eq!(
            calories,
            ColumnType::Decimal {
                precision: 8,
                scale: 2
            }
        );
        assert_ne!(calories, ColumnType::Real);
    }
}
