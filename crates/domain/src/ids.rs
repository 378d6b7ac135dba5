//! Identifiers that cross bounded-context boundaries.

common::uuid_id!(
    /// A catalogue product.
    ProductId
);

common::uuid_id!(
    /// The customer an order, payment or return belongs to.
    CustomerId
);

common::uuid_id!(
    /// A staff member or system actor that issued a command.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        let id = ProductId::new();
        let parsed: ProductId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn ids_serialize_as_bare_uuid() {
        let id = CustomerId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
