use platform_api::ApiError;
use products_crm::DealError;

/// Map a domain failure onto the shared API taxonomy. Storage failures are
/// logged and masked.
pub fn api_error(err: DealError) -> ApiError {
    match err {
        DealError::NotFound { entity, id } => ApiError::NotFound(format!("{entity} {id}")),
        DealError::NoOp => ApiError::InvalidInput(DealError::NoOp.to_string()),
        DealError::InvalidInput(message) => ApiError::InvalidInput(message),
        DealError::Failed(source) => {
            ApiError::internal(anyhow::Error::new(source).context("deal operation failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use products_crm::StoreError;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn maps_each_kind_to_a_status() {
        let missing = api_error(DealError::NotFound {
            entity: "deal",
            id: Uuid::nil(),
        });
        assert_eq!(missing.http_status(), 404);
        assert_eq!(missing.code(), "NOT_FOUND");

        assert_eq!(api_error(DealError::NoOp).http_status(), 400);
        assert_eq!(
            api_error(DealError::InvalidInput("title".into())).code(),
            "INVALID_INPUT"
        );

        let failed = api_error(DealError::Failed(StoreError::Unavailable("down".into())));
        assert_eq!(failed.http_status(), 500);
        assert_eq!(failed.to_string(), "internal server error");
    }
}
