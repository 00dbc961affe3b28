// Device endpoints
//
// Reads go through `GET /Device/UserData/{userName}`; every mutation is
// a POST that the backend applies to the controller's live record. The
// client never invents ordering: device lists are returned exactly as
// the backend sends them.

use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{DeviceLive, DeviceMapping, UpsertDeviceLive};

impl ApiClient {
    /// Fetch every controller mapped to an account, in backend order.
    ///
    /// `GET /Device/UserData/{userName}`. An account with no mapped
    /// controllers returns an empty list, which is a successful
    /// response, not an error.
    pub async fn user_devices(&self, user_name: &str) -> Result<Vec<DeviceLive>, Error> {
        let url = self.endpoint_url(&format!("Device/UserData/{user_name}"))?;
        debug!(user_name, "fetching device list");
        self.get_json(url).await
    }

    /// Push a live-state update to one controller.
    ///
    /// `POST /Device/UpsertDeviceLive`. When both times are `None` the
    /// backend flips `status` and leaves the stored schedule untouched.
    pub async fn upsert_device_live(&self, body: &UpsertDeviceLive) -> Result<(), Error> {
        let url = self.endpoint_url("Device/UpsertDeviceLive")?;
        debug!(imei = %body.imei, status = body.status, "upserting device live state");
        self.post_ok(url, body).await
    }

    /// Switch a controller on or off without touching its schedule.
    ///
    /// Shorthand for [`ApiClient::upsert_device_live`] with null times.
    pub async fn set_device_status(&self, imei: &str, status: bool) -> Result<(), Error> {
        self.upsert_device_live(&UpsertDeviceLive {
            imei: imei.to_owned(),
            status,
            star_time: None,
            end_time: None,
        })
        .await
    }

    /// Mark one gate valve as the default for its account.
    ///
    /// `POST /Device/UpdateDefaultGV` with `{imei}`. The backend keeps
    /// at most one default per account; sending an IMEI makes that
    /// valve the default and clears the rest.
    pub async fn update_default_gv(&self, imei: &str) -> Result<(), Error> {
        let url = self.endpoint_url("Device/UpdateDefaultGV")?;
        debug!(imei, "updating default gate valve");
        self.post_ok(url, &json!({ "imei": imei })).await
    }

    /// Create or update a motor-to-valve mapping for an account.
    ///
    /// `POST /device/upsert-mapping` (the one lowercase route in the
    /// backend).
    pub async fn upsert_mapping(&self, body: &DeviceMapping) -> Result<(), Error> {
        let url = self.endpoint_url("device/upsert-mapping")?;
        debug!(
            tp_imei = %body.tp_imei,
            gv_imei = %body.gv_imei,
            "upserting device mapping"
        );
        self.post_ok(url, body).await
    }
}
