use crate::app::errors::AppError;
use crate::app::App;
use crate::model::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};

impl App {
    /// Creates a pending order and its items.
    pub fn place_order(
        &self,
        user_id: &str,
        restaurant_id: &str,
        total_amount: f64,
        delivery_address: Option<String>,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, AppError> {
        let order = self
            .store
            .insert_order(&NewOrder {
                user_id: user_id.to_string(),
                restaurant_id: restaurant_id.to_string(),
                total_amount,
                delivery_address,
                status: OrderStatus::Pending,
            })
            .map_err(|err| {
                log::error!("error placing order: {err}");
                err
            })?;

        let items: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: String::new(),
                order_id: order.id.clone(),
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                special_instructions: item.special_instructions,
            })
            .collect();

        if let Err(err) = self.store.insert_order_items(&items) {
            log::error!("error placing items of order {}: {err}", order.id);
            return Err(err);
        }

        log::info!("order {} placed with {} items", order.id, items.len());
        Ok(order)
    }
}
