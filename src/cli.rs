use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::model::{Coordinates, SortBy};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Latitude of the user
    #[clap(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the user
    #[clap(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

impl LocationArgs {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSection {
    Highlights,
    Promotions,
    Videos,
    Rankings,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API.
    Serve {},

    /// Search restaurants
    Search {
        /// Free text, interpreted by the language model when available
        query: Option<String>,

        /// Category (repeatable)
        #[clap(short = 'c', long = "category")]
        categories: Vec<String>,

        /// Vibe tag (repeatable)
        #[clap(long = "vibe")]
        vibes: Vec<String>,

        /// Highest price level, 1 to 4
        #[clap(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
        price: Option<u8>,

        /// Only restaurants within this many kilometres
        #[clap(short = 'd', long)]
        max_distance: Option<f64>,

        /// Only restaurants open right now
        #[clap(long, default_value = "false")]
        open_now: bool,

        /// Required attribute, e.g. `wifi` (repeatable)
        #[clap(short = 'a', long = "attribute")]
        attributes: Vec<String>,

        #[clap(long)]
        city: Option<String>,

        #[clap(long)]
        state: Option<String>,

        /// Only highly rated restaurants with many reviews
        #[clap(long, default_value = "false")]
        perola: bool,

        /// Only restaurants with promotions
        #[clap(long, default_value = "false")]
        promotions: bool,

        /// rating, distance, price or popularity
        #[clap(short, long)]
        sort: Option<SortBy>,

        #[clap(flatten)]
        location: LocationArgs,

        /// Print the count
        #[clap(short = 'n', long, default_value = "false")]
        count: bool,
    },

    /// Show one restaurant
    Restaurant {
        id: String,

        /// Print the menu instead
        #[clap(long, default_value = "false")]
        menu: bool,

        /// Print the videos instead
        #[clap(long, default_value = "false")]
        videos: bool,
    },

    /// Home feed, or one of its sections
    Feed {
        #[clap(long, value_enum)]
        section: Option<FeedSection>,

        #[clap(flatten)]
        location: LocationArgs,
    },

    /// Cities with restaurants, or the nearest one when a location is given
    Locations {
        #[clap(flatten)]
        location: LocationArgs,
    },

    /// Talk to the concierge
    Chat {
        /// Send one message and exit
        #[clap(short, long)]
        message: Option<String>,

        /// Forget the conversation
        #[clap(long, default_value = "false")]
        clear: bool,
    },

    /// Live Google Places search
    Places {
        query: String,

        /// City appended to the query when it names none
        #[clap(long)]
        city: Option<String>,

        #[clap(flatten)]
        location: LocationArgs,
    },

    /// Reviews of a restaurant
    Reviews { restaurant_id: String },

    /// Write a review
    Review {
        restaurant_id: String,

        #[clap(short, long)]
        user: String,

        #[clap(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        #[clap(short, long)]
        comment: Option<String>,
    },

    /// Favorites of a user
    Favorites {
        user: String,

        /// Print the restaurants instead of the favorite rows
        #[clap(long, default_value = "false")]
        restaurants: bool,

        /// Print only restaurant ids
        #[clap(long, default_value = "false")]
        ids: bool,
    },

    /// Add or remove a favorite
    Favorite { user: String, restaurant_id: String },

    /// Active coupons of a restaurant
    Coupons { restaurant_id: String },

    /// Redeem a coupon
    Redeem { coupon_id: String },

    /// Notifications of a user
    Notifications {
        user: String,

        /// Print the unread count
        #[clap(long, default_value = "false")]
        unread: bool,

        /// Mark one notification as read
        #[clap(long)]
        read: Option<String>,

        /// Mark every notification as read
        #[clap(long, default_value = "false")]
        read_all: bool,
    },

    /// Place an order
    Order {
        #[clap(short, long)]
        user: String,

        #[clap(short, long)]
        restaurant: String,

        #[clap(short, long)]
        total: f64,

        #[clap(short, long)]
        address: Option<String>,

        /// `menu_item_id:quantity:unit_price` (repeatable)
        #[clap(short, long = "item")]
        items: Vec<String>,
    },
}
