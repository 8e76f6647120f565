use crate::model::{AvailableLocation, Coordinates, NearestCity};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (Haversine).
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// City used when no catalogue location is known.
pub fn default_city() -> NearestCity {
    NearestCity {
        state: "SP".to_string(),
        city: "Taubaté".to_string(),
        lat: -23.0333,
        lng: -45.5500,
    }
}

/// Closest catalogue city to `user`. Ties keep the first city seen.
pub fn nearest_city(user: Coordinates, locations: &[AvailableLocation]) -> NearestCity {
    let mut nearest = default_city();
    let mut min_distance = f64::INFINITY;

    for location in locations {
        for city in &location.cities {
            let d = distance_km(user, Coordinates::new(city.lat, city.lng));
            if d < min_distance {
                min_distance = d;
                nearest = NearestCity {
                    state: location.state.clone(),
                    city: city.name.clone(),
                    lat: city.lat,
                    lng: city.lng,
                };
            }
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::City;

    #[test]
    fn test_distance_sao_paulo_rio() {
        let sp = Coordinates::new(-23.5505, -46.6333);
        let rj = Coordinates::new(-22.9068, -43.1729);
        let d = distance_km(sp, rj);
        assert!((d - 360.75).abs() < 0.5, "got {d}");
        assert!((distance_km(rj, sp) - d).abs() < 1e-9);
    }

    #[test]
    fn test_distance_zero() {
        let p = Coordinates::new(-23.02, -45.55);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_nearest_city() {
        let locations = vec![
            AvailableLocation {
                state: "MG".to_string(),
                cities: vec![City {
                    name: "Juiz de Fora".to_string(),
                    lat: -21.7642,
                    lng: -43.3503,
                }],
            },
            AvailableLocation {
                state: "SP".to_string(),
                cities: vec![
                    City {
                        name: "Pindamonhangaba".to_string(),
                        lat: -22.9246,
                        lng: -45.4613,
                    },
                    City {
                        name: "Taubaté".to_string(),
                        lat: -23.0264,
                        lng: -45.5553,
                    },
                ],
            },
        ];

        let nearest = nearest_city(Coordinates::new(-23.03, -45.56), &locations);
        assert_eq!(nearest.city, "Taubaté");
        assert_eq!(nearest.state, "SP");

        let nearest = nearest_city(Coordinates::new(-21.8, -43.3), &locations);
        assert_eq!(nearest.city, "Juiz de Fora");
    }

    #[test]
    fn test_nearest_city_without_locations() {
        let nearest = nearest_city(Coordinates::new(0.0, 0.0), &[]);
        assert_eq!(nearest, default_city());
    }
}
