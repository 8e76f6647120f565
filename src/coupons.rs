use chrono::{SecondsFormat, Utc};

use crate::app::App;
use crate::model::Coupon;

impl App {
    /// Active coupons that have not expired yet.
    pub fn coupons_for_restaurant(&self, restaurant_id: &str) -> Vec<Coupon> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.store
            .active_coupons(restaurant_id, &now)
            .unwrap_or_else(|err| {
                log::error!("error fetching coupons: {err}");
                Vec::new()
            })
    }

    /// Counts one redemption. `false` when the coupon is unknown or used up.
    pub fn redeem_coupon(&self, coupon_id: &str) -> bool {
        let Err(err) = self.store.increment_coupon_redemption(coupon_id) else {
            return true;
        };
        log::warn!("redemption rpc failed, incrementing manually: {err}");

        let coupon = match self.store.coupon(coupon_id) {
            Ok(Some(coupon)) => coupon,
            Ok(None) => return false,
            Err(err) => {
                log::error!("error fetching coupon {coupon_id}: {err}");
                return false;
            }
        };

        if let Some(max) = coupon.max_redemptions.filter(|max| *max > 0) {
            if coupon.current_redemptions >= max {
                log::info!("coupon {coupon_id} reached {max} redemptions");
                return false;
            }
        }

        // a failed write still counts as redeemed, the client already used the code
        if let Err(err) = self
            .store
            .set_coupon_redemptions(coupon_id, coupon.current_redemptions + 1)
        {
            log::error!("failed to update coupon {coupon_id}: {err}");
        }

        true
    }
}
