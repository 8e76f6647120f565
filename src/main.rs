use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

mod app;
mod chat;
mod cli;
mod config;
mod coupons;
mod eid;
mod favorites;
mod feed;
mod gemini;
mod model;
mod notifications;
mod orders;
mod places;
mod reviews;
mod search;
mod storage;
mod store;
mod supabase;
#[cfg(test)]
mod tests;
mod utils;
mod web;

use app::AppFactory;
use chat::ChatSession;
use cli::FeedSection;
use config::Credentials;
use inquire::error::InquireResult;
use model::{NewOrderItem, NewReview, SearchFilters};

/// Parses `menu_item_id:quantity:unit_price`.
pub fn parse_order_item(item: &str) -> anyhow::Result<NewOrderItem> {
    let parts: Vec<&str> = item.split(':').map(str::trim).collect();
    let [menu_item_id, quantity, unit_price] = parts.as_slice() else {
        bail!("expected menu_item_id:quantity:unit_price, got {item:?}");
    };
    if menu_item_id.is_empty() {
        bail!("missing menu item id in {item:?}");
    }

    Ok(NewOrderItem {
        menu_item_id: menu_item_id.to_string(),
        quantity: quantity
            .parse()
            .with_context(|| format!("invalid quantity in {item:?}"))?,
        unit_price: unit_price
            .parse()
            .with_context(|| format!("invalid unit price in {item:?}"))?,
        special_instructions: None,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let paths = AppFactory::get_paths()?;
    let credentials = Credentials::from_env();
    let app = AppFactory::create_app(&paths, &credentials)?;

    match args.command {
        cli::Command::Serve {} => {
            let gemini = AppFactory::create_gemini_proxy(&credentials)?;
            web::start_daemon(app, gemini)
        }

        cli::Command::Search {
            query,
            categories,
            vibes,
            price,
            max_distance,
            open_now,
            attributes,
            city,
            state,
            perola,
            promotions,
            sort,
            location,
            count,
        } => {
            let attributes: BTreeMap<String, Value> = attributes
                .into_iter()
                .map(|key| (key, Value::Bool(true)))
                .collect();

            let filters = SearchFilters {
                query,
                categories: (!categories.is_empty()).then_some(categories),
                vibes: (!vibes.is_empty()).then_some(vibes),
                price_level: price,
                max_distance_km: max_distance,
                open_now: open_now.then_some(true),
                attributes: (!attributes.is_empty()).then_some(attributes),
                city,
                state,
                is_perola: perola.then_some(true),
                has_promotions: promotions.then_some(true),
                lat: location.lat,
                lng: location.lng,
                sort_by: sort,
            };

            let result = app.search_restaurants(filters);

            if count {
                println!("{} restaurants found", result.restaurants.len());
                return Ok(());
            }

            if let Some(interpretation) = &result.ai_interpretation {
                log::info!("interpreted as: {interpretation}");
            }
            print_json(&result)
        }

        cli::Command::Restaurant { id, menu, videos } => {
            if menu {
                return print_json(&app.menu_items(&id));
            }
            if videos {
                return print_json(&app.restaurant_videos(&id));
            }

            match app.restaurant_details(&id) {
                Some(details) => print_json(&details),
                None => bail!("restaurant {id} not found"),
            }
        }

        cli::Command::Feed { section, location } => {
            let at = location.coordinates();
            match section {
                None => print_json(&app.home_feed(at)),
                Some(FeedSection::Highlights) => print_json(&app.highlights(at)),
                Some(FeedSection::Promotions) => print_json(&app.promotions(at)),
                Some(FeedSection::Videos) => print_json(&app.videos(at)),
                Some(FeedSection::Rankings) => print_json(&app.ranked_categories(at)),
            }
        }

        cli::Command::Locations { location } => match location.coordinates() {
            Some(at) => print_json(&app.nearest_city(at)),
            None => print_json(&app.available_locations()),
        },

        cli::Command::Chat { message, clear } => {
            let storage = storage::BackendLocal::new(&paths.base_path)
                .context("Failed to open chat storage")?;
            let mut session = ChatSession::open(Box::new(storage));

            if clear {
                session.clear_history();
                println!("{}", chat::CLEARED);
                return Ok(());
            }

            if let Some(message) = message {
                if let Some(reply) = session.send_message(&app, &message) {
                    print_json(reply)?;
                }
                return Ok(());
            }

            if let Some(last) = session.messages().last() {
                println!("{}", last.content);
            }

            loop {
                let input = match inquire::Text::new(">").prompt() {
                    InquireResult::Ok(input) => input,
                    InquireResult::Err(
                        inquire::InquireError::OperationCanceled
                        | inquire::InquireError::OperationInterrupted,
                    ) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                };

                let Some(reply) = session.send_message(&app, &input) else {
                    continue;
                };

                println!("{}", reply.content);
                for restaurant in reply.suggested_restaurants.iter().flatten() {
                    println!("  • {} ({}) [{}]", restaurant.name, restaurant.city, restaurant.id);
                }
            }
        }

        cli::Command::Places {
            query,
            city,
            location,
        } => {
            let Some(provider) = &app.places else {
                bail!("GOOGLE_MAPS_API_KEY is not set");
            };
            let city = city.unwrap_or_else(|| app.config.default_city.clone());

            let found = places::fetch_places_by_query(
                provider.as_ref(),
                &app.config,
                &query,
                &city,
                location.coordinates(),
            );
            print_json(&found)
        }

        cli::Command::Reviews { restaurant_id } => print_json(&app.reviews(&restaurant_id)),

        cli::Command::Review {
            restaurant_id,
            user,
            rating,
            comment,
        } => {
            let review = app.add_review(NewReview {
                user_id: user,
                restaurant_id,
                rating,
                comment,
                ..Default::default()
            })?;
            print_json(&review)
        }

        cli::Command::Favorites {
            user,
            restaurants,
            ids,
        } => {
            if restaurants {
                print_json(&app.favorite_restaurants(&user))
            } else if ids {
                print_json(&app.favorite_ids(&user))
            } else {
                print_json(&app.favorites(&user))
            }
        }

        cli::Command::Favorite {
            user,
            restaurant_id,
        } => {
            if app.toggle_favorite(&user, &restaurant_id)? {
                println!("{restaurant_id} added to favorites");
            } else {
                println!("{restaurant_id} removed from favorites");
            }
            Ok(())
        }

        cli::Command::Coupons { restaurant_id } => {
            print_json(&app.coupons_for_restaurant(&restaurant_id))
        }

        cli::Command::Redeem { coupon_id } => {
            if !app.redeem_coupon(&coupon_id) {
                bail!("coupon {coupon_id} could not be redeemed");
            }
            println!("coupon {coupon_id} redeemed");
            Ok(())
        }

        cli::Command::Notifications {
            user,
            unread,
            read,
            read_all,
        } => {
            if let Some(id) = read {
                app.mark_as_read(&id)?;
            }
            if read_all {
                app.mark_all_as_read(&user)?;
            }

            if unread {
                println!("{} unread notifications", app.unread_count(&user));
                return Ok(());
            }
            print_json(&app.notifications(&user))
        }

        cli::Command::Order {
            user,
            restaurant,
            total,
            address,
            items,
        } => {
            let items = items
                .iter()
                .map(|item| parse_order_item(item))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let order = app.place_order(&user, &restaurant, total, address, items)?;
            print_json(&order)
        }
    }
}

