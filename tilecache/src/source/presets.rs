//! Built-in tile sources.
//!
//! Presets have stable numeric ids so configuration files can refer to them.
//! Several entries are kept for id stability even though the service behind
//! them is gone; those have no URI template and never download.

use super::types::{CachePolicy, SourceDescriptor, SourceId, DEFAULT_CACHE_PERIOD_SECS};

const OSM_NOTICE: &str = "© OpenStreetMap contributors";
const GOOGLE_NOTICE: &str = "©2017 Google";
const GOOGLE_URL: &str = "http://www.google.com/intl/fr_fr/help/legalnotices_maps.html";
const MICROSOFT_NOTICE: &str = "©2017 Microsoft Corporation";
const MICROSOFT_URL: &str =
    "http://windows.microsoft.com:80/en-gb/windows-live/microsoft-services-agreement";
const MML_NOTICE: &str = "CC 4.0 licence (© Maanmittauslaitos)";
const MML_URL: &str = "http://www.maanmittauslaitos.fi/avoimen-tietoaineiston-cc-40-lisenssi";

/// Cache period of the Google traffic overlay (ten minutes).
const TRAFFIC_CACHE_PERIOD_SECS: u32 = 60 * 10;

/// Identifiers of the built-in sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PresetId {
    OpenStreetMap = 1,
    OpenStreetMapRenderer = 2,
    OpenAerialMap = 3,
    MapsForFree = 4,
    OpenCycleMap = 5,
    OsmPublicTransport = 6,
    GoogleStreet = 7,
    GoogleSatellite = 8,
    GoogleHybrid = 9,
    VirtualEarthStreet = 10,
    VirtualEarthSatellite = 11,
    VirtualEarthHybrid = 12,
    YahooStreet = 13,
    YahooSatellite = 14,
    YahooHybrid = 15,
    OsmcTrails = 16,
    OpenSeaMap = 17,
    GoogleTraffic = 18,
    MmlPeruskartta = 19,
    MmlOrtokuva = 20,
    MmlTaustakartta = 21,
    HikeAndBike = 22,
    HillShading = 23,
}

impl PresetId {
    /// Every preset in id order.
    pub const ALL: [PresetId; 23] = [
        PresetId::OpenStreetMap,
        PresetId::OpenStreetMapRenderer,
        PresetId::OpenAerialMap,
        PresetId::MapsForFree,
        PresetId::OpenCycleMap,
        PresetId::OsmPublicTransport,
        PresetId::GoogleStreet,
        PresetId::GoogleSatellite,
        PresetId::GoogleHybrid,
        PresetId::VirtualEarthStreet,
        PresetId::VirtualEarthSatellite,
        PresetId::VirtualEarthHybrid,
        PresetId::YahooStreet,
        PresetId::YahooSatellite,
        PresetId::YahooHybrid,
        PresetId::OsmcTrails,
        PresetId::OpenSeaMap,
        PresetId::GoogleTraffic,
        PresetId::MmlPeruskartta,
        PresetId::MmlOrtokuva,
        PresetId::MmlTaustakartta,
        PresetId::HikeAndBike,
        PresetId::HillShading,
    ];

    pub fn id(self) -> SourceId {
        SourceId(self as u32)
    }

    /// Maps a numeric id back to a preset.
    pub fn from_id(id: SourceId) -> Option<PresetId> {
        PresetId::ALL.into_iter().find(|p| p.id() == id)
    }
}

/// A preset's descriptor plus whether it starts active.
#[derive(Debug, Clone)]
pub struct Preset {
    pub descriptor: SourceDescriptor,
    pub active: bool,
}

impl Preset {
    fn active(descriptor: SourceDescriptor) -> Self {
        Self {
            descriptor,
            active: true,
        }
    }

    fn inactive(descriptor: SourceDescriptor) -> Self {
        Self {
            descriptor,
            active: false,
        }
    }
}

/// Placeholder for a retired service: name and zoom range only.
fn retired(name: &str) -> SourceDescriptor {
    SourceDescriptor::new(name, "", "png", 1, 17).without_uri()
}

/// Returns the descriptor of a built-in source.
pub fn preset(id: PresetId) -> Preset {
    use PresetId::*;

    match id {
        OpenStreetMap => Preset::active(
            SourceDescriptor::new(
                "OpenStreetMap I",
                "http://tile.openstreetmap.org/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright(OSM_NOTICE, "http://www.openstreetmap.org/copyright"),
        ),
        OpenStreetMapRenderer => Preset::active(
            SourceDescriptor::new(
                "OpenStreetMap II",
                "http://otile1.mqcdn.com/tiles/1.0.0/osm/#Z/#X/#Y.png",
                "png",
                1,
                17,
            )
            .with_copyright("Tiles Courtesy of MapQuest", "http://www.mapquest.com/"),
        ),
        OpenAerialMap => Preset::active(retired("OpenAerialMap")),
        MapsForFree => Preset::active(SourceDescriptor::new(
            "Maps-For-Free",
            "http://maps-for-free.com/layer/relief/z#Z/row#Y/#Z_#X-#Y.jpg",
            "jpg",
            1,
            11,
        )),
        OpenCycleMap => Preset::active(
            SourceDescriptor::new(
                "OpenCycleMap",
                "https://tile.thunderforest.com/cycle/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright(
                "Map © Thunderforest, data © www.osm.org/copyright",
                "http://www.thunderforest.com",
            ),
        ),
        OsmPublicTransport => Preset::active(
            SourceDescriptor::new(
                "Public Transport",
                "http://tile.memomaps.de/tilegen/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright("CC-BY-SA license (© by MeMomaps)", "http://memomaps.de"),
        ),
        GoogleStreet => Preset::active(
            SourceDescriptor::new(
                "Google Maps",
                "http://mt#R.google.com/vt/v=w2.97&x=#X&y=#Y&z=#Z",
                "png",
                1,
                17,
            )
            .with_copyright(GOOGLE_NOTICE, GOOGLE_URL),
        ),
        GoogleSatellite => Preset::active(
            SourceDescriptor::new(
                "Google Satellite",
                "http://khm#R.google.com/kh/v=51&x=#X&y=#Y&z=#Z",
                "jpg",
                1,
                18,
            )
            .with_copyright(GOOGLE_NOTICE, GOOGLE_URL),
        ),
        GoogleHybrid => Preset::active(retired("Google Hybrid")),
        VirtualEarthStreet => Preset::active(
            SourceDescriptor::new(
                "Virtual Earth",
                "http://a#R.ortho.tiles.virtualearth.net/tiles/r#W.jpeg?g=50",
                "png",
                1,
                17,
            )
            .with_copyright(MICROSOFT_NOTICE, MICROSOFT_URL),
        ),
        VirtualEarthSatellite => Preset::active(
            SourceDescriptor::new(
                "Virtual Earth Satellite",
                "http://a#R.ortho.tiles.virtualearth.net/tiles/a#W.jpeg?g=50",
                "jpeg",
                1,
                17,
            )
            .with_copyright(MICROSOFT_NOTICE, MICROSOFT_URL),
        ),
        VirtualEarthHybrid => Preset::active(
            SourceDescriptor::new(
                "Virtual Earth Hybrid",
                "http://a#R.ortho.tiles.virtualearth.net/tiles/h#W.jpeg?g=50",
                "jpeg",
                1,
                17,
            )
            .with_copyright(MICROSOFT_NOTICE, MICROSOFT_URL),
        ),
        YahooStreet => Preset::active(retired("Yahoo Maps")),
        YahooSatellite => Preset::active(retired("Yahoo Satellite")),
        YahooHybrid => Preset::active(retired("Yahoo Hybrid")),
        OsmcTrails => Preset::active(SourceDescriptor::new(
            "OSMC Trails",
            "http://topo.geofabrik.de/trails/#Z/#X/#Y.png",
            "png",
            1,
            15,
        )),
        OpenSeaMap => Preset::active(
            SourceDescriptor::new(
                "OpenSeaMap",
                "http://t1.openseamap.org/seamark/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright(OSM_NOTICE, "http://openseamap.org/"),
        ),
        GoogleTraffic => Preset::active(
            SourceDescriptor::new(
                "Google traffic",
                "http://mt#R.google.com/mapstt?zoom=#Z&x=#X&y=#Y",
                "png",
                1,
                17,
            )
            .with_copyright(GOOGLE_NOTICE, GOOGLE_URL)
            .with_cache(TRAFFIC_CACHE_PERIOD_SECS, CachePolicy::HonorTtl),
        ),
        MmlPeruskartta => Preset::active(
            SourceDescriptor::new(
                "Peruskartta",
                "http://tiles.kartat.kapsi.fi/peruskartta/#Z/#X/#Y.png",
                "png",
                1,
                20,
            )
            .with_copyright(MML_NOTICE, MML_URL),
        ),
        MmlOrtokuva => Preset::active(
            SourceDescriptor::new(
                "Ortoilmakuva",
                "http://tiles.kartat.kapsi.fi/ortokuva/#Z/#X/#Y.png",
                "png",
                1,
                20,
            )
            .with_copyright(MML_NOTICE, MML_URL),
        ),
        MmlTaustakartta => Preset::active(
            SourceDescriptor::new(
                "Taustakartta",
                "http://tiles.kartat.kapsi.fi/taustakartta/#Z/#X/#Y.png",
                "png",
                1,
                20,
            )
            .with_copyright(MML_NOTICE, MML_URL),
        ),
        HikeAndBike => Preset::inactive(
            SourceDescriptor::new(
                "Hike and bike",
                "http://#T.tiles.wmflabs.org/hikebike/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright(OSM_NOTICE, "http://www.hikebikemap.org"),
        ),
        HillShading => Preset::inactive(
            SourceDescriptor::new(
                "Hill shading",
                "http://#T.tiles.wmflabs.org/hillshading/#Z/#X/#Y.png",
                "png",
                1,
                18,
            )
            .with_copyright("© NASA (SRTM3 v2)", "http://www2.jpl.nasa.gov/srtm/"),
        ),
    }
}
