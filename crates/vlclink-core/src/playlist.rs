//! Playlist control
//!
//! The engine owns the playlist and schedules playback; this is a thin
//! call-through bound to one instance.

use std::ffi::c_char;
use std::ptr;

use crate::error::Result;
use crate::ffi::c_string;
use crate::session::Session;


/// Playlist of an instance, borrowed from [`Instance::playlist`](crate::Instance::playlist).
#[derive( Clone, Copy )]
pub struct Playlist<'a> {
    session: &'a Session,
}


impl<'a> Playlist<'a> {
    pub(crate) fn new( session: &'a Session ) -> Self {
        Self { session }
    }


    pub fn is_playing( &self ) -> Result<bool> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        let playing = locked.call( |api, ex| unsafe { ( api.playlist_isplaying )( instance, ex ) } )?;
        Ok( playing != 0 )
    }


    /// Number of items in the playlist.
    pub fn count( &self ) -> Result<i32> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_items_count )( instance, ex ) } )
    }


    /// Id of the current item, or -1 if there is none.
    pub fn current_item( &self ) -> Result<i32> {
        let locked = self.session.lock();
        let vlc_id = locked.vlc_id()?;
        // SAFETY: vlc_id names a live instance and the lock is held.
        Ok( unsafe { ( locked.api().playlist_index )( vlc_id ) } )
    }


    /// Starts playback of the item with the given id, or of the current item.
    pub fn play( &self, item: Option<i32> ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        let item = item.unwrap_or( -1 );
        locked.call( |api, ex| unsafe { ( api.playlist_play )( instance, item, 0, ptr::null(), ex ) } )
    }


    /// Toggles pause.
    pub fn pause( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_pause )( instance, ex ) } )
    }


    pub fn stop( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_stop )( instance, ex ) } )
    }


    pub fn next( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_next )( instance, ex ) } )
    }


    pub fn prev( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_prev )( instance, ex ) } )
    }


    /// Removes every item.
    pub fn clear( &self ) -> Result<()> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_clear )( instance, ex ) } )
    }


    /// Appends `uri` and returns the new item's id.
    pub fn add( &self, uri: &str, name: Option<&str> ) -> Result<i32> {
        let uri = c_string( uri )?;
        let name = name.map( c_string ).transpose()?;
        let name_ptr: *const c_char = name.as_ref().map_or( ptr::null(), |name| name.as_ptr() );

        let locked = self.session.lock();
        let instance = locked.instance()?;
        let id = locked.call( |api, ex| unsafe { ( api.playlist_add )( instance, uri.as_ptr(), name_ptr, ex ) } )?;
        tracing::debug!( "Added playlist item {}", id );
        Ok( id )
    }


    /// Removes the item with the given id. Returns the engine's status code.
    pub fn delete_item( &self, item: i32 ) -> Result<i32> {
        let locked = self.session.lock();
        let instance = locked.instance()?;
        locked.call( |api, ex| unsafe { ( api.playlist_delete_item )( instance, item, ex ) } )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::config::VlcConfig;
    use crate::error::VlcError;
    use crate::fake;
    use crate::instance::Instance;


    fn instance() -> Instance {
        Instance::new( fake::api(), &VlcConfig::default() ).unwrap()
    }


    #[test]
    fn test_add_then_play() {
        let instance = instance();
        let playlist = instance.playlist();

        assert_eq!( playlist.count().unwrap(), 0 );
        let id = playlist.add( "file:///tmp/a.mp4", Some( "" ) ).unwrap();
        assert!( id >= 0 );
        assert_eq!( playlist.count().unwrap(), 1 );

        playlist.play( Some( id ) ).unwrap();
        let playing = ( 0..10 ).any( |_| playlist.is_playing().unwrap() );
        assert!( playing );
        assert_eq!( playlist.current_item().unwrap(), id );
    }


    #[test]
    fn test_play_empty_playlist() {
        let instance = instance();
        match instance.playlist().play( None ) {
            Err( VlcError::Engine( message ) ) => assert_eq!( message, "Empty playlist" ),
            other => panic!( "expected engine error, got {:?}", other ),
        }
    }


    #[test]
    fn test_navigation() {
        let instance = instance();
        let playlist = instance.playlist();
        let first = playlist.add( "file:///tmp/a.mp4", None ).unwrap();
        let second = playlist.add( "file:///tmp/b.mp4", Some( "b" ) ).unwrap();
        assert_eq!( playlist.current_item().unwrap(), -1 );

        playlist.play( None ).unwrap();
        assert_eq!( playlist.current_item().unwrap(), first );
        playlist.next().unwrap();
        assert_eq!( playlist.current_item().unwrap(), second );
        playlist.prev().unwrap();
        assert_eq!( playlist.current_item().unwrap(), first );

        playlist.stop().unwrap();
        assert!( !playlist.is_playing().unwrap() );
    }


    #[test]
    fn test_delete_and_clear() {
        let instance = instance();
        let playlist = instance.playlist();
        let id = playlist.add( "file:///tmp/a.mp4", None ).unwrap();
        playlist.add( "file:///tmp/b.mp4", None ).unwrap();

        assert_eq!( playlist.delete_item( id ).unwrap(), 0 );
        assert_ne!( playlist.delete_item( id ).unwrap(), 0 );
        assert_eq!( playlist.count().unwrap(), 1 );

        playlist.clear().unwrap();
        assert_eq!( playlist.count().unwrap(), 0 );
    }


    #[test]
    fn test_pause_toggles() {
        let instance = instance();
        let playlist = instance.playlist();
        playlist.add( "file:///tmp/a.mp4", None ).unwrap();
        playlist.play( None ).unwrap();
        while !playlist.is_playing().unwrap() {}

        playlist.pause().unwrap();
        assert!( !playlist.is_playing().unwrap() );
        playlist.pause().unwrap();
        assert!( playlist.is_playing().unwrap() );
    }
}
