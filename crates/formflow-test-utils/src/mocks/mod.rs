//! mockall mocks of the engine ports

use async_trait::async_trait;
use formflow_core::{
    FormError, FormEvent, FormEventHandler, FormState, OtpDispatch, OtpProvider, SelectionStore,
    SubmissionEndpoint, SubmissionReceipt, Transport, TransportError, TransportResponse,
};
use mockall::mock;

mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn post(
            &self,
            path: &str,
            body: serde_json::Value,
        ) -> Result<TransportResponse, TransportError>;
        async fn get(&self, path: &str) -> Result<TransportResponse, TransportError>;
    }
}

mock! {
    pub OtpProvider {}

    #[async_trait]
    impl OtpProvider for OtpProvider {
        async fn request_otp(&self, phone_number: &str) -> Result<OtpDispatch, FormError>;
    }
}

mock! {
    pub SubmissionEndpoint {}

    #[async_trait]
    impl SubmissionEndpoint<FormState> for SubmissionEndpoint {
        type Receipt = SubmissionReceipt;
        async fn submit(&self, data: &FormState) -> Result<SubmissionReceipt, FormError>;
    }
}

mock! {
    pub SelectionStore {}

    #[async_trait]
    impl SelectionStore for SelectionStore {
        async fn get(&self, key: &str) -> Result<Option<String>, FormError>;
        async fn set(&self, key: &str, value: &str) -> Result<(), FormError>;
    }
}

mock! {
    pub EventHandler {}

    #[async_trait]
    impl FormEventHandler for EventHandler {
        async fn handle_event(&self, event: FormEvent) -> Result<(), FormError>;
    }
}
