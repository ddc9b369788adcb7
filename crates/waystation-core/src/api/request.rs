//! Request execution shared by every registry operation.

use crate::error::{RegistryError, Result};
use crate::retry::retry_async;
use crate::transport::{RegistryRequest, RegistryResponse};
use crate::RegistryClient;

impl RegistryClient {
    /// Send `request`, bounded by the request timeout, the retry policy and the
    /// client's cancellation token.
    ///
    /// Anything other than a 200 becomes [`RegistryError::Status`].
    pub(crate) async fn execute(&self, request: RegistryRequest) -> Result<RegistryResponse> {
        let timeout = self.config.request_timeout;

        retry_async(&self.config.retry, &self.cancel_token, || {
            let request = request.clone();
            async move {
                let endpoint = request.endpoint().to_string();
                let call = tokio::time::timeout(timeout, self.transport.send(request));

                let response = match self.cancel_token.run_until_cancelled(call).await {
                    Some(Ok(result)) => result?,
                    Some(Err(_elapsed)) => return Err(RegistryError::Timeout(timeout)),
                    None => return Err(RegistryError::Cancelled),
                };

                if response.is_success() {
                    Ok(response)
                } else {
                    Err(RegistryError::status(endpoint, response.status, &response.body))
                }
            }
        })
        .await
    }
}
